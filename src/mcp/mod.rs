//! Model Context Protocol adapter (JSON-RPC over stdio).

pub mod protocol;
pub mod server;

pub use server::McpServer;
