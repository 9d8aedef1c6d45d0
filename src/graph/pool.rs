//! Graph session pool: bounded, reusable backend connections.
//!
//! Capacity is enforced with a semaphore: a [`GraphSession`] owns one permit
//! for its whole lifetime. Connections are opened lazily up to `max_size`,
//! parked in an idle queue on release, and liveness-checked before reuse if
//! they sat idle longer than `stale_after`.
//!
//! Release happens in `Drop`, so a session is returned exactly once on every
//! exit path: explicit [`GraphSession::release`], early return, panic, or
//! cancellation of the task holding it.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::graph::backend::{BackendError, GraphBackend, GraphConnection, Query, Row};
use crate::types::{Error, LeaseId, PoolConfig, Result};

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub max_size: usize,
    /// Established connections (idle + leased).
    pub open: usize,
    pub idle: usize,
    /// Sessions currently leased out.
    pub outstanding: usize,
    /// Leases handed out since startup.
    pub total_leases: u64,
}

struct IdleConnection {
    conn: Box<dyn GraphConnection>,
    idle_since: Instant,
}

struct PoolInner {
    backend: Arc<dyn GraphBackend>,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<IdleConnection>>,
    open: AtomicUsize,
    outstanding: AtomicUsize,
    total_leases: AtomicU64,
    closed: AtomicBool,
}

impl PoolInner {
    fn idle_queue(&self) -> MutexGuard<'_, VecDeque<IdleConnection>> {
        // The queue is never left half-updated, so a poisoned lock is still usable.
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn open_connection(&self) -> std::result::Result<Box<dyn GraphConnection>, BackendError> {
        let conn = self.backend.connect().await?;
        let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(open, endpoint = %self.backend.endpoint(), "backend connection opened");
        Ok(conn)
    }

    fn discard(&self, _conn: Box<dyn GraphConnection>, reason: &str) {
        let open = self.open.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::debug!(open, reason, "backend connection discarded");
    }

    /// Reuse an idle connection or open a new one. Caller holds a permit.
    async fn checkout(&self) -> Result<Box<dyn GraphConnection>> {
        loop {
            let candidate = self.idle_queue().pop_front();
            let Some(IdleConnection { mut conn, idle_since }) = candidate else {
                return self.open_connection().await.map_err(|e| {
                    tracing::warn!(error = %e, "failed to open backend connection");
                    Error::backend_unavailable(e.message)
                });
            };

            if idle_since.elapsed() < self.config.stale_after {
                return Ok(conn);
            }
            match conn.ping().await {
                Ok(()) => return Ok(conn),
                Err(e) => {
                    tracing::warn!(error = %e, "stale connection failed liveness check");
                    self.discard(conn, "stale");
                }
            }
        }
    }

    fn give_back(&self, conn: Option<Box<dyn GraphConnection>>, healthy: bool) {
        let Some(conn) = conn else { return };
        if self.closed.load(Ordering::SeqCst) {
            self.discard(conn, "pool closed");
        } else if !healthy {
            tracing::warn!("unhealthy connection returned to pool, replacing lazily");
            self.discard(conn, "unhealthy");
        } else {
            self.idle_queue().push_back(IdleConnection {
                conn,
                idle_since: Instant::now(),
            });
        }
    }
}

/// Shared handle to the process-wide session pool.
#[derive(Clone)]
pub struct SessionPool {
    inner: Arc<PoolInner>,
}

impl fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPool")
            .field("endpoint", &self.inner.backend.endpoint())
            .field("stats", &self.stats())
            .finish()
    }
}

impl SessionPool {
    /// Build the pool and verify the backend is reachable.
    ///
    /// One connection is opened and pinged eagerly so that a dead backend fails
    /// startup with `BackendUnavailable` instead of failing the first call.
    pub async fn connect(backend: Arc<dyn GraphBackend>, config: PoolConfig) -> Result<Self> {
        let pool = Self::new_lazy(backend, config)?;

        let mut conn = pool
            .inner
            .open_connection()
            .await
            .map_err(|e| Error::backend_unavailable(e.message))?;
        if let Err(e) = conn.ping().await {
            pool.inner.discard(conn, "startup liveness check failed");
            return Err(Error::backend_unavailable(e.message));
        }
        pool.inner.give_back(Some(conn), true);

        tracing::info!(
            endpoint = %pool.inner.backend.endpoint(),
            max_size = pool.inner.config.max_size,
            "session pool ready"
        );
        Ok(pool)
    }

    /// Build the pool without touching the backend.
    pub fn new_lazy(backend: Arc<dyn GraphBackend>, config: PoolConfig) -> Result<Self> {
        if config.max_size == 0 {
            return Err(Error::internal("pool max_size must be positive"));
        }
        Ok(Self {
            inner: Arc::new(PoolInner {
                backend,
                permits: Arc::new(Semaphore::new(config.max_size)),
                config,
                idle: Mutex::new(VecDeque::new()),
                open: AtomicUsize::new(0),
                outstanding: AtomicUsize::new(0),
                total_leases: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Lease a session, waiting at most `timeout` for capacity.
    pub async fn acquire(&self, timeout: Duration) -> Result<GraphSession> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(Error::backend_unavailable("session pool is closed"));
        }

        let permit = match tokio::time::timeout(timeout, self.inner.permits.clone().acquire_owned()).await {
            Err(_elapsed) => {
                return Err(Error::pool_exhausted(format!(
                    "no session available within {}ms (max_size={})",
                    timeout.as_millis(),
                    self.inner.config.max_size
                )));
            }
            Ok(Err(_)) => return Err(Error::backend_unavailable("session pool is closed")),
            Ok(Ok(permit)) => permit,
        };

        // On failure the permit drops here and capacity is restored.
        let conn = self.inner.checkout().await?;

        self.inner.outstanding.fetch_add(1, Ordering::SeqCst);
        self.inner.total_leases.fetch_add(1, Ordering::Relaxed);
        let session = GraphSession {
            lease_id: LeaseId::generate(),
            conn: Some(conn),
            healthy: true,
            pool: self.inner.clone(),
            _permit: permit,
        };
        tracing::trace!(lease_id = %session.lease_id, "session acquired");
        Ok(session)
    }

    /// Return a session. Equivalent to dropping it.
    pub fn release(&self, session: GraphSession) {
        session.release();
    }

    /// Close idle connections and refuse further leases. Leased sessions are
    /// discarded when they come back.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.permits.close();
        let drained: Vec<IdleConnection> = self.inner.idle_queue().drain(..).collect();
        let count = drained.len();
        for idle in drained {
            self.inner.discard(idle.conn, "pool closed");
        }
        tracing::info!(closed_idle = count, "session pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            max_size: self.inner.config.max_size,
            open: self.inner.open.load(Ordering::SeqCst),
            idle: self.inner.idle_queue().len(),
            outstanding: self.inner.outstanding.load(Ordering::SeqCst),
            total_leases: self.inner.total_leases.load(Ordering::Relaxed),
        }
    }

    /// Configured acquire timeout.
    pub fn acquire_timeout(&self) -> Duration {
        self.inner.config.acquire_timeout
    }
}

/// Exclusive lease on one backend connection.
pub struct GraphSession {
    lease_id: LeaseId,
    conn: Option<Box<dyn GraphConnection>>,
    healthy: bool,
    pool: Arc<PoolInner>,
    // Dropped after `Drop::drop` has parked the connection, so a waiter woken
    // by the permit finds it in the idle queue.
    _permit: OwnedSemaphorePermit,
}

impl fmt::Debug for GraphSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphSession")
            .field("lease_id", &self.lease_id)
            .field("healthy", &self.healthy)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl GraphSession {
    pub fn lease_id(&self) -> &LeaseId {
        &self.lease_id
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    /// Do not return this connection to the idle queue.
    pub fn mark_unhealthy(&mut self) {
        self.healthy = false;
    }

    /// Run one query on the leased connection.
    pub async fn run(&mut self, query: &Query) -> std::result::Result<Vec<Row>, BackendError> {
        match self.conn.as_mut() {
            Some(conn) => conn.run(query).await,
            None => Err(BackendError::unavailable("session has no live connection")),
        }
    }

    /// Replace the underlying connection with a fresh one.
    pub async fn reconnect(&mut self) -> std::result::Result<(), BackendError> {
        if let Some(old) = self.conn.take() {
            self.pool.discard(old, "reconnect");
        }
        match self.pool.open_connection().await {
            Ok(conn) => {
                self.conn = Some(conn);
                self.healthy = true;
                Ok(())
            }
            Err(e) => {
                self.healthy = false;
                Err(e)
            }
        }
    }

    /// Return the session to its pool.
    pub fn release(self) {}
}

impl Drop for GraphSession {
    fn drop(&mut self) {
        self.pool.give_back(self.conn.take(), self.healthy);
        self.pool.outstanding.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(lease_id = %self.lease_id, healthy = self.healthy, "session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::testing::StubBackend;
    use pretty_assertions::assert_eq;

    fn config(max_size: usize) -> PoolConfig {
        PoolConfig {
            max_size,
            acquire_timeout: Duration::from_millis(200),
            stale_after: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn connect_fails_fast_when_backend_down() {
        let backend = StubBackend::new();
        backend.state.fail_connect.store(true, Ordering::SeqCst);
        let err = SessionPool::connect(backend.shared(), config(2)).await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn connect_fails_fast_when_ping_fails() {
        let backend = StubBackend::new();
        backend.state.fail_ping.store(true, Ordering::SeqCst);
        let err = SessionPool::connect(backend.shared(), config(2)).await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn sessions_are_reused() {
        let backend = StubBackend::new();
        let pool = SessionPool::connect(backend.shared(), config(2)).await.unwrap();

        for _ in 0..5 {
            let session = pool.acquire(Duration::from_millis(50)).await.unwrap();
            session.release();
        }

        assert_eq!(backend.state.connects.load(Ordering::SeqCst), 1);
        let stats = pool.stats();
        assert_eq!(stats.open, 1);
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.outstanding, 0);
        assert_eq!(stats.total_leases, 5);
    }

    #[tokio::test]
    async fn exhausted_pool_times_out() {
        let backend = StubBackend::new();
        let pool = SessionPool::connect(backend.shared(), config(1)).await.unwrap();

        let held = pool.acquire(Duration::from_millis(50)).await.unwrap();
        let err = pool.acquire(Duration::from_millis(30)).await.unwrap_err();
        assert!(matches!(err, Error::PoolExhausted(_)));

        drop(held);
        assert!(pool.acquire(Duration::from_millis(30)).await.is_ok());
    }

    #[tokio::test]
    async fn waiter_proceeds_after_release() {
        let backend = StubBackend::new();
        let pool = SessionPool::connect(backend.shared(), config(1)).await.unwrap();

        let held = pool.acquire(Duration::from_millis(50)).await.unwrap();
        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire(Duration::from_secs(2)).await.map(|s| s.release()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        held.release();

        waiter.await.unwrap().unwrap();
        assert_eq!(pool.stats().open, 1);
    }

    #[tokio::test]
    async fn unhealthy_session_is_replaced() {
        let backend = StubBackend::new();
        let pool = SessionPool::connect(backend.shared(), config(1)).await.unwrap();

        let mut session = pool.acquire(Duration::from_millis(50)).await.unwrap();
        session.mark_unhealthy();
        session.release();
        assert_eq!(pool.stats().open, 0);

        let session = pool.acquire(Duration::from_millis(50)).await.unwrap();
        assert!(session.is_healthy());
        assert_eq!(backend.state.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_connection_is_checked_and_dropped() {
        let backend = StubBackend::new();
        let mut cfg = config(1);
        cfg.stale_after = Duration::from_millis(1);
        let pool = SessionPool::connect(backend.shared(), cfg).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        backend.state.fail_ping.store(true, Ordering::SeqCst);

        let session = pool.acquire(Duration::from_millis(50)).await.unwrap();
        assert_eq!(backend.state.connects.load(Ordering::SeqCst), 2);
        session.release();
        assert_eq!(pool.stats().open, 1);
    }

    #[tokio::test]
    async fn connect_failure_during_acquire_restores_capacity() {
        let backend = StubBackend::new();
        let pool = SessionPool::connect(backend.shared(), config(1)).await.unwrap();

        let mut session = pool.acquire(Duration::from_millis(50)).await.unwrap();
        session.mark_unhealthy();
        drop(session);

        backend.state.fail_connect.store(true, Ordering::SeqCst);
        let err = pool.acquire(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));

        backend.state.fail_connect.store(false, Ordering::SeqCst);
        assert!(pool.acquire(Duration::from_millis(50)).await.is_ok());
    }

    #[tokio::test]
    async fn dropped_task_releases_session() {
        let backend = StubBackend::new();
        let pool = SessionPool::connect(backend.shared(), config(1)).await.unwrap();

        let task = {
            let pool = pool.clone();
            tokio::spawn(async move {
                let _session = pool.acquire(Duration::from_millis(50)).await.unwrap();
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(pool.stats().outstanding, 1);

        task.abort();
        let _ = task.await;
        assert_eq!(pool.stats().outstanding, 0);
        assert_eq!(pool.stats().idle, 1);
    }

    #[tokio::test]
    async fn closed_pool_refuses_leases() {
        let backend = StubBackend::new();
        let pool = SessionPool::connect(backend.shared(), config(2)).await.unwrap();
        let held = pool.acquire(Duration::from_millis(50)).await.unwrap();

        pool.close();
        let err = pool.acquire(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));

        held.release();
        assert_eq!(pool.stats().open, 0);
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn reconnect_swaps_connection() {
        let backend = StubBackend::new();
        let pool = SessionPool::connect(backend.shared(), config(1)).await.unwrap();
        let mut session = pool.acquire(Duration::from_millis(50)).await.unwrap();

        session.reconnect().await.unwrap();
        assert_eq!(backend.state.connects.load(Ordering::SeqCst), 2);
        assert_eq!(pool.stats().open, 1);

        backend.state.fail_connect.store(true, Ordering::SeqCst);
        assert!(session.reconnect().await.is_err());
        assert!(!session.is_healthy());
        session.release();
        assert_eq!(pool.stats().open, 0);
        assert_eq!(pool.stats().outstanding, 0);
    }
}
