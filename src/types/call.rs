//! Per-call records exchanged between the protocol layer and the dispatcher.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{CallId, Error, ErrorKind};

/// An inbound tool invocation, owned by the dispatch path handling it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub call_id: CallId,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(
        call_id: impl Into<CallId>,
        tool_name: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Structured failure carried in a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&Error> for ErrorDetail {
    fn from(err: &Error) -> Self {
        let details = match err {
            Error::ArgumentValidation { params, .. } => {
                Some(serde_json::json!({ "params": params }))
            }
            Error::ToolExecution { kind, params, .. } if !params.is_empty() => {
                Some(serde_json::json!({ "original_kind": kind, "params": params }))
            }
            Error::ToolExecution { kind, .. } => {
                Some(serde_json::json!({ "original_kind": kind }))
            }
            _ => None,
        };
        Self {
            kind: err.kind(),
            message: err.message(),
            details,
        }
    }
}

/// Outcome of one call, consumed once by the protocol layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub call_id: CallId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl ToolCallResult {
    pub fn success(call_id: CallId, result: Value) -> Self {
        Self {
            call_id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(call_id: CallId, err: &Error) -> Self {
        Self {
            call_id,
            success: false,
            result: None,
            error: Some(ErrorDetail::from(err)),
        }
    }

    /// Error kind, if the call failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
