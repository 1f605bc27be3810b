//! Tool capability trait
//!
//! A tool is a named function the backend can ask an agent to run mid-run.
//! Its output is always text: failures are reported inside that text so the
//! reasoning loop can correct itself.

use async_trait::async_trait;

use crate::agent::run_state::DelegationStack;
use crate::core::{Identity, ToolDefinition};

/// Context handed to a tool alongside its parameters
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// The agent whose run requested the tool
    pub caller: Identity,
    /// Conversation whose run requested the call
    pub conversation_id: String,
    /// Conversations currently waiting on this call, outermost first
    pub stack: DelegationStack,
}

impl ToolContext {
    pub fn new(caller: Identity, conversation_id: impl Into<String>, stack: DelegationStack) -> Self {
        Self {
            caller,
            conversation_id: conversation_id.into(),
            stack,
        }
    }
}

/// Trait for agent tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the backend uses to call this tool
    fn name(&self) -> &str;

    /// Description shown to the backend
    fn description(&self) -> &str;

    /// JSON schema of the parameters object
    fn parameters(&self) -> serde_json::Value;

    /// Run the tool
    async fn run(&self, parameters: serde_json::Value, context: ToolContext) -> String;

    /// Function definition registered with the backend persona
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.name(), self.description(), self.parameters())
    }
}
