//! Tools module - capabilities agents can invoke mid-run
//!
//! Contains the tool trait, the per-agent tool set, and the built-in tools.

pub mod operation;
pub mod registry;
pub mod talk_to_agent;
pub mod tool;

pub use operation::OperationTool;
pub use registry::ToolSet;
pub use talk_to_agent::{TalkToAgent, UNREACHABLE_AGENT_MESSAGE};
pub use tool::{Tool, ToolContext};
