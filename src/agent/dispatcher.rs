//! Tool dispatcher
//!
//! Resolves a backend tool call against the recipient agent's tool set.
//! Unknown tools and malformed arguments become output text so the backend can
//! correct itself; they never fail the run.

use tracing::debug;

use crate::agent::persona::Agent;
use crate::agent::run_state::DelegationStack;
use crate::core::ToolCall;
use crate::tools::ToolContext;

/// Dispatches tool calls for one agent
pub struct ToolDispatcher<'a> {
    agent: &'a Agent,
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(agent: &'a Agent) -> Self {
        Self { agent }
    }

    /// Text logged before running a call
    pub fn describe(call: &ToolCall) -> String {
        format!(
            "Action required. Running tool {} with parameters {}",
            call.name, call.arguments
        )
    }

    /// Text logged after a call produced its output
    pub fn describe_output(call: &ToolCall, output: &str) -> String {
        format!("{} completed. Response: {}", call.name, output)
    }

    /// Output returned when the requested tool does not exist
    pub fn not_found(&self, name: &str) -> String {
        format!(
            "ERROR: no tool named '{}' exists. Try again with the correct name. Available tools: {}",
            name,
            self.agent.tools().names().join(", ")
        )
    }

    /// Run one call and return its output text
    pub async fn dispatch(
        &self,
        call: &ToolCall,
        conversation_id: &str,
        stack: &DelegationStack,
    ) -> String {
        let Some(tool) = self.agent.tools().get(&call.name) else {
            debug!(agent = %self.agent.name(), tool = %call.name, "unknown tool requested");
            return self.not_found(&call.name);
        };

        let parameters = match parse_arguments(&call.arguments) {
            Ok(parameters) => parameters,
            Err(reason) => {
                return format!(
                    "ERROR: the parameters for {} are not a valid JSON object: {}",
                    call.name, reason
                )
            }
        };

        debug!(agent = %self.agent.name(), tool = %call.name, "running tool");
        let context = ToolContext::new(
            self.agent.identity().clone(),
            conversation_id,
            stack.clone(),
        );
        tool.run(parameters, context).await
    }
}

/// Parse a backend argument string; an empty string counts as no parameters
fn parse_arguments(arguments: &str) -> std::result::Result<serde_json::Value, String> {
    if arguments.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    match serde_json::from_str::<serde_json::Value>(arguments) {
        Ok(value @ serde_json::Value::Object(_)) => Ok(value),
        Ok(other) => Err(format!("expected an object, got {}", other)),
        Err(e) => Err(e.to_string()),
    }
}
