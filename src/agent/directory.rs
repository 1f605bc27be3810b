//! Conversation directory
//!
//! Name-keyed index of the conversations of one agency. Delegation tools hold
//! a weak handle so that agents (which own their tools) never keep the
//! conversations that own them alive.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::agent::conversation::Conversation;

type Index = HashMap<(String, String), Arc<Conversation>>;

/// Conversations indexed by `(sender name, recipient name)`
#[derive(Clone, Default)]
pub struct ConversationDirectory {
    inner: Arc<RwLock<Index>>,
}

/// Non-owning handle onto a [`ConversationDirectory`]
#[derive(Clone, Default)]
pub struct DirectoryHandle {
    inner: Weak<RwLock<Index>>,
}

impl ConversationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for tools that must look conversations up later
    pub fn handle(&self) -> DirectoryHandle {
        DirectoryHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Register a conversation under its sender and recipient names
    pub fn insert(&self, conversation: Arc<Conversation>) {
        let key = (
            conversation.sender().name.clone(),
            conversation.recipient().name().to_string(),
        );
        self.inner.write().insert(key, conversation);
    }

    pub fn get(&self, sender: &str, recipient: &str) -> Option<Arc<Conversation>> {
        lookup(&self.inner.read(), sender, recipient)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl DirectoryHandle {
    /// Look a conversation up; `None` once the directory has been dropped
    pub fn get(&self, sender: &str, recipient: &str) -> Option<Arc<Conversation>> {
        let inner = self.inner.upgrade()?;
        let index = inner.read();
        lookup(&index, sender, recipient)
    }
}

fn lookup(index: &Index, sender: &str, recipient: &str) -> Option<Arc<Conversation>> {
    index
        .get(&(sender.to_string(), recipient.to_string()))
        .cloned()
}

impl std::fmt::Debug for ConversationDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let index = self.inner.read();
        f.debug_list()
            .entries(index.keys().map(|(s, r)| format!("{}->{}", s, r)))
            .finish()
    }
}

impl std::fmt::Debug for DirectoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryHandle")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_outlived_by_directory() {
        let directory = ConversationDirectory::new();
        let handle = directory.handle();
        assert!(handle.get("User", "MainAgent").is_none());
        assert!(directory.is_empty());

        drop(directory);
        assert!(handle.get("User", "MainAgent").is_none());
    }
}
