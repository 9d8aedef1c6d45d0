//! Handler seam between the dispatcher and tool implementations.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

use crate::graph::{GraphSession, Query, QueryExecutor, ResultSet};
use crate::types::{CallId, Error, Result};

/// Execution context handed to a handler for one call.
///
/// `session` is `Some` exactly when the tool declared
/// [`SessionRequirement::Graph`](crate::tools::SessionRequirement::Graph).
pub struct ToolContext<'a> {
    pub call_id: &'a CallId,
    executor: &'a QueryExecutor,
    session: Option<&'a mut GraphSession>,
}

impl fmt::Debug for ToolContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("call_id", &self.call_id)
            .field("has_session", &self.session.is_some())
            .finish()
    }
}

impl<'a> ToolContext<'a> {
    pub fn new(
        call_id: &'a CallId,
        executor: &'a QueryExecutor,
        session: Option<&'a mut GraphSession>,
    ) -> Self {
        Self {
            call_id,
            executor,
            session,
        }
    }

    /// Run a query through the executor in the leased session.
    pub async fn query(&mut self, query: &Query) -> Result<ResultSet> {
        let session = self
            .session
            .as_deref_mut()
            .ok_or_else(|| Error::internal("tool ran a query without a leased session"))?;
        self.executor.execute(session, query).await
    }
}

/// Validated, default-filled arguments.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    inner: Map<String, Value>,
}

impl ToolArgs {
    pub fn new(inner: Map<String, Value>) -> Self {
        Self { inner }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.get(name)
    }

    /// Trimmed string value; blank strings read as absent.
    pub fn str_opt(&self, name: &str) -> Option<String> {
        self.inner
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn str_required(&self, name: &str) -> Result<String> {
        self.str_opt(name)
            .ok_or_else(|| Error::invalid_argument(name, format!("{} must be a non-empty string", name)))
    }

    pub fn i64_or(&self, name: &str, default: i64) -> i64 {
        self.inner.get(name).and_then(Value::as_i64).unwrap_or(default)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.inner
    }
}

/// A tool implementation.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: &mut ToolContext<'_>, args: &ToolArgs) -> Result<Value>;
}

/// Synchronous handler for tools that never touch the graph.
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&ToolArgs) -> Result<Value> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(&ToolArgs) -> Result<Value> + Send + Sync,
{
    async fn call(&self, _ctx: &mut ToolContext<'_>, args: &ToolArgs) -> Result<Value> {
        (self.f)(args)
    }
}
