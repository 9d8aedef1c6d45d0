//! Backend boundary: session-oriented graph query interface.
//!
//! A [`GraphBackend`] opens connections; a [`GraphConnection`] runs one
//! parameterized query at a time. Backends classify their failures into
//! [`BackendErrorKind`] so that the executor can tell transient from
//! permanent errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::types::Error;

/// One result row: field name → value.
pub type Row = Map<String, Value>;

/// Parameterized query. Values always travel in `params`, never in `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Map::new(),
        }
    }

    /// Bind a parameter (`$name` in the query text).
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Bind every entry of `params`.
    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params.extend(params);
        self
    }
}

/// Backend failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    /// Query text rejected by the backend. Never retried.
    Syntax,
    /// Schema constraint violated. Never retried.
    Constraint,
    /// Expected to succeed on retry (deadlock, leader switch, …).
    Transient,
    /// Connection dropped mid-request; retry after reconnecting.
    ConnectionLost,
    /// Backend cannot be reached at all.
    Unavailable,
    /// Anything else the backend reports. Never retried.
    Fatal,
}

impl BackendErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, BackendErrorKind::Transient | BackendErrorKind::ConnectionLost)
    }
}

/// Classified backend error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Syntax, message)
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Constraint, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Transient, message)
    }

    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::ConnectionLost, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unavailable, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Fatal, message)
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        match err.kind {
            BackendErrorKind::Syntax => Error::query_syntax(err.message),
            BackendErrorKind::Constraint => Error::constraint_violation(err.message),
            BackendErrorKind::Transient | BackendErrorKind::ConnectionLost => {
                Error::transient_backend(err.message)
            }
            BackendErrorKind::Unavailable => Error::backend_unavailable(err.message),
            BackendErrorKind::Fatal => Error::internal(err.message),
        }
    }
}

/// One live connection to the graph backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphConnection: Send {
    /// Run one parameterized query and return its rows in order.
    async fn run(&mut self, query: &Query) -> Result<Vec<Row>, BackendError>;

    /// Lightweight liveness check.
    async fn ping(&mut self) -> Result<(), BackendError>;
}

/// Factory for backend connections.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn GraphConnection>, BackendError>;

    /// Endpoint description for logs (no credentials).
    fn endpoint(&self) -> String;
}

impl fmt::Debug for dyn GraphBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphBackend")
            .field("endpoint", &self.endpoint())
            .finish()
    }
}

impl fmt::Debug for dyn GraphConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GraphConnection")
    }
}
