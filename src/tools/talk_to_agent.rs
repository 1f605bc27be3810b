//! Delegation tool
//!
//! Lets an agent message another agent it has an edge to, waiting for the
//! reply before its own run continues.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::agent::directory::DirectoryHandle;
use crate::tools::tool::{Tool, ToolContext};

/// Output when the caller has no edge to the requested agent
pub const UNREACHABLE_AGENT_MESSAGE: &str = "ERROR: You cannot communicate with that agent.";

#[derive(Debug, Deserialize)]
struct TalkParams {
    recipient: String,
    message: String,
}

/// Synchronous agent-to-agent messaging
#[derive(Debug, Clone)]
pub struct TalkToAgent {
    directory: DirectoryHandle,
    max_depth: usize,
}

impl TalkToAgent {
    pub fn new(directory: DirectoryHandle, max_depth: usize) -> Self {
        Self {
            directory,
            max_depth,
        }
    }
}

#[async_trait]
impl Tool for TalkToAgent {
    fn name(&self) -> &str {
        "TalkToAgent"
    }

    fn description(&self) -> &str {
        "Use this tool for direct, synchronous communication with the specialised agents \
         of the agency. When you send a message with this tool you receive a reply from the \
         recipient agent only. To continue the dialogue, call the tool again with the same \
         recipient and your follow-up message. The recipient does no further work after it \
         replies. The user cannot see these replies, so relay what matters back to the user. \
         Keep using the tool until the task is fully resolved."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "recipient": {
                    "type": "string",
                    "description": "Name of the recipient agent"
                },
                "message": {
                    "type": "string",
                    "description": "The task the recipient agent must complete. Describe what the task is rather than exact steps."
                }
            },
            "required": ["recipient", "message"]
        })
    }

    async fn run(&self, parameters: serde_json::Value, context: ToolContext) -> String {
        let params: TalkParams = match serde_json::from_value(parameters) {
            Ok(params) => params,
            Err(e) => return format!("ERROR: TalkToAgent needs a recipient and a message: {}", e),
        };

        let Some(conversation) = self.directory.get(&context.caller.name, &params.recipient) else {
            debug!(sender = %context.caller.name, recipient = %params.recipient, "no edge to recipient");
            return UNREACHABLE_AGENT_MESSAGE.to_string();
        };

        let key = conversation.key();
        if context.stack.contains(&key) {
            warn!(conversation = %key, "delegation loop refused");
            return format!(
                "ERROR: {} is already waiting on this conversation. Delegating to it again would loop; \
                 answer with the information you have.",
                params.recipient
            );
        }
        if context.stack.depth() >= self.max_depth {
            warn!(conversation = %key, depth = context.stack.depth(), "delegation depth exceeded");
            return format!(
                "ERROR: delegation chain is already {} conversations deep. \
                 Answer with the information you have.",
                context.stack.depth()
            );
        }

        match conversation.send_within(&params.message, &context.stack).await {
            Ok(reply) => reply,
            Err(e) => format!("ERROR: {} could not answer: {}", params.recipient, e),
        }
    }
}
