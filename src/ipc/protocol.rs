//! Request envelopes carried in `MSG_REQUEST` frames.
//!
//! ```text
//! {"op": "call", "call_id": "...", "tool_name": "...", "arguments": {...}}
//! {"op": "list_tools", "call_id": "..."}
//! ```
//! Responses are [`ToolCallResult`] envelopes:
//! `{call_id, success, result | error: {kind, message, details?}}`.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::types::{CallId, Error, ToolCallRequest, ToolCallResult};

/// Decoded request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RequestEnvelope {
    Call {
        call_id: CallId,
        tool_name: String,
        #[serde(default)]
        arguments: Map<String, Value>,
    },
    ListTools {
        call_id: CallId,
    },
}

impl RequestEnvelope {
    pub fn call_id(&self) -> &CallId {
        match self {
            RequestEnvelope::Call { call_id, .. } | RequestEnvelope::ListTools { call_id } => call_id,
        }
    }
}

impl From<ToolCallRequest> for RequestEnvelope {
    fn from(request: ToolCallRequest) -> Self {
        RequestEnvelope::Call {
            call_id: request.call_id,
            tool_name: request.tool_name,
            arguments: request.arguments,
        }
    }
}

/// A request that could not be decoded. Keeps the call id when one was
/// readable so the caller can still correlate the failure.
#[derive(Debug)]
pub struct DecodeFailure {
    pub call_id: Option<CallId>,
    pub error: Error,
}

impl DecodeFailure {
    pub fn into_result(self) -> ToolCallResult {
        let call_id = self.call_id.unwrap_or_else(|| CallId::from(""));
        ToolCallResult::failure(call_id, &self.error)
    }
}

/// Decode a msgpack request payload.
pub fn decode_request(payload: &[u8]) -> Result<RequestEnvelope, DecodeFailure> {
    let value: Value = rmp_serde::from_slice(payload).map_err(|e| DecodeFailure {
        call_id: None,
        error: Error::malformed_request(format!("invalid msgpack: {}", e)),
    })?;
    decode_value(value)
}

/// Decode an already-parsed request value.
pub fn decode_value(value: Value) -> Result<RequestEnvelope, DecodeFailure> {
    let call_id = value
        .get("call_id")
        .and_then(Value::as_str)
        .map(CallId::from);

    serde_json::from_value(value).map_err(|e| DecodeFailure {
        call_id,
        error: Error::malformed_request(format!("invalid request envelope: {}", e)),
    })
}
