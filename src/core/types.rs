//! Shared types used across agency modules
//!
//! Contains participant identities, conversation messages, and tool call shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted id of the human participant
pub const USER_ID: &str = "user";

/// Display name of the human participant
pub const USER_NAME: &str = "User";

/// A participant addressed by the graph and by messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// External identity, `None` until the backing persona exists
    pub id: Option<String>,
    /// Display name, unique within one agency
    pub name: String,
}

impl Identity {
    /// Create an identity that has not been registered with the backend yet
    pub fn unregistered(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// Create an identity with a known external id
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
        }
    }

    /// The human participant
    pub fn user() -> Self {
        Self::new(USER_ID, USER_NAME)
    }

    /// Whether this identity is the human participant
    pub fn is_user(&self) -> bool {
        self.id.as_deref() == Some(USER_ID)
    }

    /// The id used in persisted rows
    pub fn persisted_id(&self) -> String {
        self.id.clone().unwrap_or_default()
    }
}

/// Kind of a logged message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// A conversational turn
    Text,
    /// A tool call requested by the recipient agent
    Action,
    /// The output of a tool call
    ActionResponse,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::Text => write!(f, "text"),
            MessageType::Action => write!(f, "action"),
            MessageType::ActionResponse => write!(f, "action_response"),
        }
    }
}

/// A logged message in a conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub date: DateTime<Utc>,
    pub kind: MessageType,
    pub content: String,
    pub from: Identity,
    pub to: Identity,
}

impl Message {
    /// Create a new message stamped with a fresh id and the current time
    pub fn new(kind: MessageType, content: impl Into<String>, from: Identity, to: Identity) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date: Utc::now(),
            kind,
            content: content.into(),
            from,
            to,
        }
    }

    /// The shape exposed to observers (names instead of ids)
    pub fn view(&self) -> MessageView {
        MessageView {
            date: self.date,
            kind: self.kind,
            content: self.content.clone(),
            from: self.from.name.clone(),
            to: self.to.name.clone(),
        }
    }
}

/// A message as seen by API clients and live subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    pub from: String,
    pub to: String,
}

/// A tool call requested by the backend during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Backend id of the call, echoed back with the output
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// Raw JSON argument string as produced by the backend
    pub arguments: String,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Output of one tool call, submitted back to the backend in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

impl ToolOutput {
    pub fn new(tool_call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            output: output.into(),
        }
    }
}

/// Definition of a tool that can be called by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function" for now)
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}
