//! TCP+msgpack transport for tool calls and discovery.
//!
//! Length-prefixed msgpack frames carry request envelopes in and
//! [`ToolCallResult`](crate::types::ToolCallResult) envelopes out.

pub mod codec;
pub mod protocol;
pub mod router;
pub mod server;

pub use protocol::{decode_request, RequestEnvelope};
pub use server::ProtocolServer;
