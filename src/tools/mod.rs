//! Tool infrastructure.
//!
//! The registry owns tool metadata and argument validation, the dispatcher
//! owns the per-call lifecycle, and handlers own the query bodies.

pub mod catalog;
pub mod dispatcher;
pub mod graph;
pub mod handler;

pub use catalog::{
    ParamDef, ParamType, SessionRequirement, ToolCategory, ToolDescriptor, ToolMetadata,
    ToolRegistry,
};
pub use dispatcher::{CallState, Dispatcher};
pub use graph::{register_builtin_tools, EntityRef};
pub use handler::{FnHandler, ToolArgs, ToolContext, ToolHandler};
