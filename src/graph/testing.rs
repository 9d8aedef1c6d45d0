//! Scriptable in-memory backend for unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::graph::backend::{BackendError, GraphBackend, GraphConnection, Query, Row};

#[derive(Default)]
pub(crate) struct StubState {
    pub connects: AtomicUsize,
    pub runs: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub fail_ping: AtomicBool,
    /// Responses handed out in order; an empty script yields empty results.
    pub script: Mutex<VecDeque<Result<Vec<Row>, BackendError>>>,
    /// Artificial latency for every `run`.
    pub latency: Mutex<Duration>,
    /// Last query seen by any connection.
    pub last_query: Mutex<Option<Query>>,
}

#[derive(Clone, Default)]
pub(crate) struct StubBackend {
    pub state: Arc<StubState>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Arc<dyn GraphBackend> {
        Arc::new(self.clone())
    }

    pub fn push(&self, response: Result<Vec<Row>, BackendError>) {
        self.state.script.lock().unwrap().push_back(response);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.state.latency.lock().unwrap() = latency;
    }

    pub fn last_query(&self) -> Option<Query> {
        self.state.last_query.lock().unwrap().clone()
    }
}

pub(crate) fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

struct StubConnection {
    state: Arc<StubState>,
}

#[async_trait]
impl GraphConnection for StubConnection {
    async fn run(&mut self, query: &Query) -> Result<Vec<Row>, BackendError> {
        self.state.runs.fetch_add(1, Ordering::SeqCst);
        *self.state.last_query.lock().unwrap() = Some(query.clone());
        let latency = *self.state.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let next = self.state.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn ping(&mut self) -> Result<(), BackendError> {
        if self.state.fail_ping.load(Ordering::SeqCst) {
            return Err(BackendError::connection_lost("ping failed"));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphBackend for StubBackend {
    async fn connect(&self) -> Result<Box<dyn GraphConnection>, BackendError> {
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(BackendError::unavailable("connection refused"));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubConnection {
            state: self.state.clone(),
        }))
    }

    fn endpoint(&self) -> String {
        "stub://memory".to_string()
    }
}
