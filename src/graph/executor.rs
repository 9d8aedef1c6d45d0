//! Query executor: runs one parameterized query inside a leased session.
//!
//! Transient backend failures are retried with exponential backoff up to the
//! configured bound; syntax, constraint and fatal errors surface immediately.
//! Each attempt is bounded by `query_timeout`; a timed-out session is marked
//! unhealthy so the pool discards its connection.

use serde::Serialize;
use std::time::Duration;

use crate::graph::backend::{BackendErrorKind, Query, Row};
use crate::graph::pool::GraphSession;
use crate::types::{Error, ExecutorConfig, Result};

/// Normalized query result: rows in backend order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }
}

/// Stateless executor; cheap to share.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    config: ExecutorConfig,
}

impl QueryExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.config
            .base_backoff
            .saturating_mul(factor)
            .min(self.config.max_backoff)
    }

    /// Run `query` in `session`, retrying transient failures.
    pub async fn execute(&self, session: &mut GraphSession, query: &Query) -> Result<ResultSet> {
        let mut retry: u32 = 0;
        loop {
            let attempt = tokio::time::timeout(self.config.query_timeout, session.run(query)).await;

            let err = match attempt {
                Ok(Ok(rows)) => return Ok(ResultSet::new(rows)),
                Ok(Err(err)) => err,
                Err(_elapsed) => {
                    session.mark_unhealthy();
                    tracing::warn!(
                        lease_id = %session.lease_id(),
                        timeout_ms = self.config.query_timeout.as_millis() as u64,
                        "query timed out, session marked unhealthy"
                    );
                    return Err(Error::timeout(format!(
                        "query exceeded {}ms",
                        self.config.query_timeout.as_millis()
                    )));
                }
            };

            if !err.kind.is_retryable() {
                if err.kind == BackendErrorKind::Unavailable {
                    session.mark_unhealthy();
                }
                return Err(err.into());
            }

            if retry >= self.config.max_retries {
                if err.kind == BackendErrorKind::ConnectionLost {
                    session.mark_unhealthy();
                }
                return Err(Error::transient_backend(format!(
                    "{} (gave up after {} attempts)",
                    err.message,
                    retry + 1
                )));
            }

            let delay = self.backoff_for(retry);
            tracing::warn!(
                attempt = retry + 1,
                backoff_ms = delay.as_millis() as u64,
                error = %err,
                "transient backend error, retrying"
            );
            tokio::time::sleep(delay).await;

            if err.kind == BackendErrorKind::ConnectionLost {
                if let Err(e) = session.reconnect().await {
                    return Err(Error::backend_unavailable(format!(
                        "reconnect after connection loss failed: {}",
                        e.message
                    )));
                }
            }
            retry += 1;
        }
    }
}
