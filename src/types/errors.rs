//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. Every
//! variant maps onto a stable [`ErrorKind`] wire code so that the protocol
//! layer only ever sees structured kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes carried in response envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    PoolExhausted,
    BackendUnavailable,
    QuerySyntaxError,
    ConstraintViolation,
    TransientBackendError,
    Timeout,
    UnknownTool,
    DuplicateTool,
    InvalidSchema,
    ArgumentValidationError,
    ToolExecutionError,
    MalformedRequest,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::PoolExhausted => "POOL_EXHAUSTED",
            ErrorKind::BackendUnavailable => "BACKEND_UNAVAILABLE",
            ErrorKind::QuerySyntaxError => "QUERY_SYNTAX_ERROR",
            ErrorKind::ConstraintViolation => "CONSTRAINT_VIOLATION",
            ErrorKind::TransientBackendError => "TRANSIENT_BACKEND_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::UnknownTool => "UNKNOWN_TOOL",
            ErrorKind::DuplicateTool => "DUPLICATE_TOOL",
            ErrorKind::InvalidSchema => "INVALID_SCHEMA",
            ErrorKind::ArgumentValidationError => "ARGUMENT_VALIDATION_ERROR",
            ErrorKind::ToolExecutionError => "TOOL_EXECUTION_ERROR",
            ErrorKind::MalformedRequest => "MALFORMED_REQUEST",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error enum for the tool server.
#[derive(Error, Debug)]
pub enum Error {
    /// No session became available within the acquire timeout.
    #[error("pool exhausted: {0}")]
    PoolExhausted(String),

    /// The graph backend cannot be reached (or the pool is closed).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("query syntax error: {0}")]
    QuerySyntax(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Transient failure that survived the executor's retry budget.
    #[error("transient backend error: {0}")]
    TransientBackend(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("duplicate tool: {0}")]
    DuplicateTool(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Arguments rejected against a tool's input schema. `params` names every
    /// offending parameter, `problems` holds one message per finding.
    #[error("argument validation error: {}", problems.join("; "))]
    ArgumentValidation {
        params: Vec<String>,
        problems: Vec<String>,
    },

    /// A handler failed. Carries the kind of the handler's own error and,
    /// for argument failures raised inside the handler, the offending params.
    #[error("tool execution error ({kind}): {message}")]
    ToolExecution {
        kind: ErrorKind,
        message: String,
        params: Vec<String>,
    },

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Internal errors, including invalid configuration.
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wire code for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PoolExhausted(_) => ErrorKind::PoolExhausted,
            Error::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            Error::QuerySyntax(_) => ErrorKind::QuerySyntaxError,
            Error::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            Error::TransientBackend(_) => ErrorKind::TransientBackendError,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::UnknownTool(_) => ErrorKind::UnknownTool,
            Error::DuplicateTool(_) => ErrorKind::DuplicateTool,
            Error::InvalidSchema(_) => ErrorKind::InvalidSchema,
            Error::ArgumentValidation { .. } => ErrorKind::ArgumentValidationError,
            Error::ToolExecution { .. } => ErrorKind::ToolExecutionError,
            Error::MalformedRequest(_) => ErrorKind::MalformedRequest,
            Error::Internal(_) | Error::Serialization(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Message without the kind prefix, as sent on the wire.
    pub fn message(&self) -> String {
        match self {
            Error::PoolExhausted(msg)
            | Error::BackendUnavailable(msg)
            | Error::QuerySyntax(msg)
            | Error::ConstraintViolation(msg)
            | Error::TransientBackend(msg)
            | Error::Timeout(msg)
            | Error::UnknownTool(msg)
            | Error::DuplicateTool(msg)
            | Error::InvalidSchema(msg)
            | Error::MalformedRequest(msg)
            | Error::Internal(msg) => msg.clone(),
            Error::ArgumentValidation { problems, .. } => problems.join("; "),
            Error::ToolExecution { message, .. } => message.clone(),
            Error::Serialization(e) => format!("serialization error: {}", e),
            Error::Io(e) => format!("io error: {}", e),
        }
    }

    /// Wrap a handler failure. Already-wrapped errors are passed through.
    pub fn into_tool_execution(self) -> Self {
        match self {
            wrapped @ Error::ToolExecution { .. } => wrapped,
            other => {
                let params = match &other {
                    Error::ArgumentValidation { params, .. } => params.clone(),
                    _ => Vec::new(),
                };
                Error::ToolExecution {
                    kind: other.kind(),
                    message: other.message(),
                    params,
                }
            }
        }
    }
}

// Convenience constructors
impl Error {
    pub fn pool_exhausted(msg: impl Into<String>) -> Self {
        Self::PoolExhausted(msg.into())
    }

    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    pub fn query_syntax(msg: impl Into<String>) -> Self {
        Self::QuerySyntax(msg.into())
    }

    pub fn constraint_violation(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    pub fn transient_backend(msg: impl Into<String>) -> Self {
        Self::TransientBackend(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool(name.into())
    }

    pub fn duplicate_tool(name: impl Into<String>) -> Self {
        Self::DuplicateTool(name.into())
    }

    pub fn invalid_schema(msg: impl Into<String>) -> Self {
        Self::InvalidSchema(msg.into())
    }

    pub fn malformed_request(msg: impl Into<String>) -> Self {
        Self::MalformedRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Single-parameter validation failure.
    pub fn invalid_argument(param: impl Into<String>, problem: impl Into<String>) -> Self {
        Self::ArgumentValidation {
            params: vec![param.into()],
            problems: vec![problem.into()],
        }
    }
}
