//! Live message broadcast
//!
//! One tokio broadcast channel per conversation, created on first use.
//! Subscribers that fall behind lose the oldest notifications.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::agent::NotificationSink;
use crate::core::MessageView;

/// Buffered notifications per conversation before slow subscribers lag
const CHANNEL_CAPACITY: usize = 256;

/// Fan-out of message notifications to live subscribers
#[derive(Debug)]
pub struct Broadcaster {
    capacity: usize,
    channels: Mutex<HashMap<String, broadcast::Sender<MessageView>>>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Receive every message logged on the conversation from now on
    pub fn subscribe(&self, conversation_id: &str) -> broadcast::Receiver<MessageView> {
        let mut channels = self.channels.lock();
        channels
            .entry(conversation_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live subscribers of a conversation
    pub fn subscriber_count(&self, conversation_id: &str) -> usize {
        self.channels
            .lock()
            .get(conversation_id)
            .map_or(0, |sender| sender.receiver_count())
    }
}

impl NotificationSink for Broadcaster {
    fn publish(&self, conversation_id: &str, message: &MessageView) {
        let channels = self.channels.lock();
        let Some(sender) = channels.get(conversation_id) else {
            return;
        };
        let delivered = sender.send(message.clone()).unwrap_or(0);
        debug!(conversation = %conversation_id, delivered, "published message");
    }
}
