//! Delegate ports reporting conversation and agent events upward
//!
//! Conversations and agents are handed a delegate at construction instead of
//! reaching for global state; the agency implements both ports and forwards
//! messages to a notification sink.

use async_trait::async_trait;

use crate::agent::persona::Agent;
use crate::core::{Message, MessageView};

/// Receives every message a conversation logs, in log order
#[async_trait]
pub trait ConversationDelegate: Send + Sync {
    async fn on_new_message(&self, conversation_id: &str, message: &Message);
}

/// Receives agents whose backend persona had drifted and was rewritten
#[async_trait]
pub trait AgentDelegate: Send + Sync {
    async fn on_agent_updated(&self, agent: &Agent);
}

/// Outbound channel for live message notifications
///
/// Publishing never blocks and never fails; undelivered notifications are
/// dropped.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, conversation_id: &str, message: &MessageView);
}
