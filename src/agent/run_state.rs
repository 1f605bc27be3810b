//! Run state management
//!
//! Tracks the in-flight run of a conversation, the timing policy of the run
//! loop, and the stack of conversations waiting on a delegated call.

use std::time::Duration;

use crate::core::{RunConfig, ToolCall};
use crate::llm::RunStatus;

/// Fixed reply returned when a turn fails on every attempt
pub const FAILED_RUN_MESSAGE: &str = "Sorry, I can't process your message right now. \
     Please try again later or check the application logs to see what is going on.";

/// Timing and bounds of the run loop
#[derive(Debug, Clone)]
pub struct RunPolicy {
    /// Delay between two status polls
    pub poll_interval: Duration,
    /// Delay before a failed turn is retried
    pub retry_backoff: Duration,
    /// Runs attempted per turn
    pub max_attempts: u32,
    /// Maximum nesting of delegated conversations
    pub max_delegation_depth: usize,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self::from(&RunConfig::default())
    }
}

impl From<&RunConfig> for RunPolicy {
    fn from(config: &RunConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            retry_backoff: config.retry_backoff(),
            max_attempts: config.max_attempts,
            max_delegation_depth: config.max_delegation_depth,
        }
    }
}

impl RunPolicy {
    /// Policy with no waiting, for driving scripted backends
    pub fn immediate() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// State of a run while it is in flight
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    /// Backend id of the run
    pub run_id: String,
    /// Last observed status
    pub status: RunStatus,
    /// Tool calls waiting for outputs
    pub pending_tool_calls: Vec<ToolCall>,
    /// 1-based attempt number of the current turn
    pub attempt: u32,
}

impl RunState {
    /// Create state for a freshly started run
    pub fn new(run_id: impl Into<String>, status: RunStatus, attempt: u32) -> Self {
        Self {
            run_id: run_id.into(),
            status,
            pending_tool_calls: Vec::new(),
            attempt,
        }
    }

    /// Whether the run must be polled again
    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }
}

/// Conversations currently waiting on a delegated call, outermost first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelegationStack {
    frames: Vec<String>,
}

impl DelegationStack {
    /// Stack of a top-level send
    pub fn root() -> Self {
        Self::default()
    }

    /// Stack seen by tools running inside the given conversation
    pub fn enter(&self, conversation_key: impl Into<String>) -> Self {
        let mut frames = self.frames.clone();
        frames.push(conversation_key.into());
        Self { frames }
    }

    /// Whether the conversation is already waiting further up the stack
    pub fn contains(&self, conversation_key: &str) -> bool {
        self.frames.iter().any(|f| f == conversation_key)
    }

    /// Number of nested conversations
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Frames, outermost first
    pub fn frames(&self) -> &[String] {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_config() {
        let policy = RunPolicy::default();
        assert_eq!(policy.poll_interval, Duration::from_secs(1));
        assert_eq!(policy.retry_backoff, Duration::from_secs(30));
        assert_eq!(policy.max_attempts, 3);

        let immediate = RunPolicy::immediate();
        assert_eq!(immediate.retry_backoff, Duration::ZERO);
        assert_eq!(immediate.max_attempts, 3);
    }

    #[test]
    fn test_run_state_pending() {
        let mut state = RunState::new("run_1", RunStatus::Queued, 1);
        assert!(state.is_pending());

        state.status = RunStatus::RequiresAction;
        assert!(!state.is_pending());
    }

    #[test]
    fn test_delegation_stack() {
        let root = DelegationStack::root();
        let inner = root.enter("User->MainAgent").enter("MainAgent->MathAgent");

        assert_eq!(root.depth(), 0);
        assert_eq!(inner.depth(), 2);
        assert!(inner.contains("User->MainAgent"));
        assert!(!inner.contains("MathAgent->MainAgent"));
        assert_eq!(inner.frames()[0], "User->MainAgent");
    }
}
