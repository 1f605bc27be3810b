//! Conversation backend trait for abstracting the reasoning service
//!
//! The engine never interprets instructions itself: it registers personas,
//! opens conversation contexts, starts runs and polls them through this trait.

use async_trait::async_trait;
use serde::Serialize;

use crate::core::{Result, ToolCall, ToolDefinition, ToolOutput};

/// Persona attributes sent to the backend when creating or updating an agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonaSpec {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<ToolDefinition>,
}

/// The backend's stored copy of a persona
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub model: String,
    /// Number of tools the backend has registered for this persona
    pub tool_count: usize,
}

impl Persona {
    /// Whether the stored persona differs from the local configuration
    pub fn drifted_from(&self, spec: &PersonaSpec) -> bool {
        self.name != spec.name
            || self.description != spec.description
            || self.instructions != spec.instructions
            || self.model != spec.model
            || self.tool_count != spec.tools.len()
    }
}

/// Status of a backend run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Cancelling,
    /// Any other status reported by the backend; treated as a failure
    Failed(String),
}

impl RunStatus {
    /// Whether the run is still being worked on and must be polled again
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling
        )
    }

    /// Wire name of the status
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Completed => "completed",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Failed(other) => other,
        }
    }
}

impl From<&str> for RunStatus {
    fn from(status: &str) -> Self {
        match status {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "requires_action" => RunStatus::RequiresAction,
            "completed" => RunStatus::Completed,
            "cancelling" => RunStatus::Cancelling,
            other => RunStatus::Failed(other.to_string()),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run as reported by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    /// Tool calls awaiting outputs; only populated when `RequiresAction`
    pub required_action: Vec<ToolCall>,
}

/// One content part of a turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnContent {
    Text(String),
    /// Non-text content, identified by its kind (e.g. `image_file`)
    Other(String),
}

/// A turn in a backend conversation context
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub id: String,
    pub role: String,
    pub content: Vec<TurnContent>,
}

/// Trait for reasoning backends
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    /// Register a new persona
    async fn create_persona(&self, spec: &PersonaSpec) -> Result<Persona>;

    /// Fetch the stored copy of a persona
    async fn retrieve_persona(&self, persona_id: &str) -> Result<Persona>;

    /// Overwrite a persona's attributes
    async fn update_persona(&self, persona_id: &str, spec: &PersonaSpec) -> Result<Persona>;

    /// Open a new conversation context and return its id
    async fn create_context(&self) -> Result<String>;

    /// Check that a context exists and return its id
    async fn retrieve_context(&self, context_id: &str) -> Result<String>;

    /// Append a user-role turn to a context
    async fn add_user_turn(&self, context_id: &str, text: &str) -> Result<()>;

    /// Start a run of the given persona over a context
    async fn create_run(&self, context_id: &str, persona_id: &str) -> Result<Run>;

    /// Fetch the current state of a run
    async fn retrieve_run(&self, context_id: &str, run_id: &str) -> Result<Run>;

    /// List the turns of a context, newest first
    async fn list_turns(&self, context_id: &str) -> Result<Vec<Turn>>;

    /// Resolve a pending action with one batch of tool outputs
    async fn submit_tool_outputs(
        &self,
        context_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run>;

    /// Get the backend name
    fn name(&self) -> &str;
}
