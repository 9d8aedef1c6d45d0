//! Core types for the tool server.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Call and lease identifiers
//! - **Errors**: The error taxonomy with stable wire codes
//! - **Config**: Configuration structures for server, backend, pool and executor
//! - **Call**: Tool call request/result records

mod call;
mod config;
mod errors;
mod ids;

pub use call::{ErrorDetail, ToolCallRequest, ToolCallResult};
pub use config::{
    BackendConfig, Config, ExecutorConfig, IpcConfig, ObservabilityConfig, PoolConfig,
    ServerConfig,
};
pub use errors::{Error, ErrorKind, Result};
pub use ids::{CallId, LeaseId};
