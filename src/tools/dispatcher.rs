//! Tool dispatcher: drives one call from lookup to session release.
//!
//! Every call walks `Received → Validated → Executing → {Succeeded | Failed}`.
//! `dispatch` always returns a [`ToolCallResult`]; handler errors and handler
//! panics both become structured failures.

use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use crate::graph::{QueryExecutor, SessionPool};
use crate::tools::catalog::{SessionRequirement, ToolMetadata, ToolRegistry};
use crate::tools::handler::{ToolArgs, ToolContext};
use crate::types::{CallId, Error, ErrorKind, Result, ToolCallRequest, ToolCallResult};

/// Per-call lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Received,
    Validated,
    Executing,
    Succeeded,
    Failed,
}

impl CallState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CallState::Succeeded | CallState::Failed)
    }
}

/// Routes tool calls to handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    pool: SessionPool,
    executor: QueryExecutor,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, pool: SessionPool, executor: QueryExecutor) -> Self {
        Self {
            registry,
            pool,
            executor,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    /// Discovery: metadata of every registered tool. Side-effect free.
    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        self.registry.metadata()
    }

    /// Run one call to completion.
    pub async fn dispatch(&self, request: ToolCallRequest) -> ToolCallResult {
        let started = Instant::now();
        let ToolCallRequest {
            call_id,
            tool_name,
            arguments,
        } = request;

        tracing::info!(
            call_id = %call_id,
            tool = %tool_name,
            state = ?CallState::Received,
            "tool call received"
        );

        let outcome = self.run(&call_id, &tool_name, arguments).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(value) => {
                tracing::info!(
                    call_id = %call_id,
                    tool = %tool_name,
                    state = ?CallState::Succeeded,
                    elapsed_ms,
                    "tool call completed"
                );
                ToolCallResult::success(call_id, value)
            }
            Err(err) => {
                tracing::warn!(
                    call_id = %call_id,
                    tool = %tool_name,
                    state = ?CallState::Failed,
                    kind = %err.kind(),
                    error = %err.message(),
                    elapsed_ms,
                    "tool call failed"
                );
                ToolCallResult::failure(call_id, &err)
            }
        }
    }

    async fn run(
        &self,
        call_id: &CallId,
        tool_name: &str,
        mut arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let descriptor = self.registry.lookup(tool_name)?;
        self.registry.validate_arguments(descriptor, &arguments)?;
        descriptor.fill_defaults(&mut arguments);
        tracing::debug!(call_id = %call_id, state = ?CallState::Validated, "arguments validated");

        // Released on every exit path when dropped at the end of this scope.
        let mut session = match descriptor.session {
            SessionRequirement::Graph => Some(self.pool.acquire(self.pool.acquire_timeout()).await?),
            SessionRequirement::None => None,
        };

        tracing::debug!(call_id = %call_id, state = ?CallState::Executing, "invoking handler");
        let args = ToolArgs::new(arguments);
        let mut ctx = ToolContext::new(call_id, &self.executor, session.as_mut());
        let handler = descriptor.handler.clone();

        let outcome = AssertUnwindSafe(handler.call(&mut ctx, &args))
            .catch_unwind()
            .await;
        drop(ctx);
        drop(session);

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.into_tool_execution()),
            Err(panic) => Err(Error::ToolExecution {
                kind: ErrorKind::Internal,
                message: format!("handler panicked: {}", panic_message(panic.as_ref())),
                params: Vec::new(),
            }),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
