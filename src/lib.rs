//! # Graph Tool Server
//!
//! Exposes graph analysis, computation and detection tools to LLM agents and
//! runs them as parameterized queries against a graph database:
//! - Bounded session pool with lazy connects, staleness checks and
//!   guaranteed release
//! - Query executor with per-attempt timeouts and transient-error retries
//! - Tool registry with schema checks and argument validation
//! - Dispatcher turning every call into a structured result
//! - TCP+msgpack protocol server and an MCP stdio adapter
//!
//! ## Architecture
//!
//! ```text
//!   TCP frames ─┐                 ┌──────────────┐
//!               ├→ decode call ─→ │  Dispatcher  │ ─→ ToolRegistry (lookup, validate)
//!   MCP stdio ──┘                 └──────┬───────┘
//!                                        │ acquire / release
//!                                 ┌──────▼───────┐      ┌──────────────┐
//!                                 │ SessionPool  │ ←──→ │ QueryExecutor│
//!                                 └──────┬───────┘      └──────────────┘
//!                                        │
//!                                   GraphBackend (Neo4j HTTP)
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod context;
pub mod graph;
pub mod ipc;
pub mod mcp;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use context::ServerContext;
pub use types::{Config, Error, ErrorKind, Result};
