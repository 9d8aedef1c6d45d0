//! Routes decoded envelopes to the dispatcher.

use crate::ipc::protocol::RequestEnvelope;
use crate::tools::Dispatcher;
use crate::types::{ToolCallRequest, ToolCallResult};

/// Handle one request envelope. Always yields a response envelope.
pub async fn route_request(dispatcher: &Dispatcher, request: RequestEnvelope) -> ToolCallResult {
    match request {
        RequestEnvelope::ListTools { call_id } => {
            let tools = dispatcher.list_tools();
            tracing::debug!(call_id = %call_id, tools = tools.len(), "discovery");
            ToolCallResult::success(call_id, serde_json::json!({ "tools": tools }))
        }
        RequestEnvelope::Call {
            call_id,
            tool_name,
            arguments,
        } => {
            dispatcher
                .dispatch(ToolCallRequest::new(call_id, tool_name, arguments))
                .await
        }
    }
}
