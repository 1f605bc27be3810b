//! JSON table store
//!
//! Three tables live in the data directory: `agents.json`,
//! `conversations.json` and `messages.json`. Every update reads the table,
//! modifies it and replaces the file atomically, serialised by one lock.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::{AgencyError, Message, MessageType, Result};

const AGENTS_TABLE: &str = "agents.json";
const CONVERSATIONS_TABLE: &str = "conversations.json";
const MESSAGES_TABLE: &str = "messages.json";

/// Persisted agent identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    pub id: String,
}

/// Persisted conversation edge, keyed by participant ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: String,
    pub sender_agent: String,
    pub recipient_agent: String,
}

/// Persisted message row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    /// Participant id of the author
    pub from: String,
    /// Participant id of the addressee
    pub to: String,
}

impl MessageRecord {
    /// Row for a message logged in the given conversation
    pub fn from_message(conversation_id: impl Into<String>, message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            conversation_id: conversation_id.into(),
            date: message.date,
            kind: message.kind,
            content: message.content.clone(),
            from: message.from.persisted_id(),
            to: message.to.persisted_id(),
        }
    }

    fn touches(&self, agent_id: &str) -> bool {
        self.from == agent_id || self.to == agent_id
    }
}

impl ConversationRecord {
    fn touches(&self, agent_id: &str) -> bool {
        self.sender_agent == agent_id || self.recipient_agent == agent_id
    }
}

/// File-backed store for the three tables
#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    /// Store rooted at `dir`; the directory is created on first write
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn load_agents(&self) -> Result<Vec<AgentRecord>> {
        let _guard = self.lock.lock().await;
        self.read_table(AGENTS_TABLE).await
    }

    pub async fn load_conversations(&self) -> Result<Vec<ConversationRecord>> {
        let _guard = self.lock.lock().await;
        self.read_table(CONVERSATIONS_TABLE).await
    }

    /// Messages of one conversation, in the order they were appended
    pub async fn load_messages(&self, conversation_id: &str) -> Result<Vec<MessageRecord>> {
        let _guard = self.lock.lock().await;
        let messages: Vec<MessageRecord> = self.read_table(MESSAGES_TABLE).await?;
        Ok(messages
            .into_iter()
            .filter(|m| m.conversation_id == conversation_id)
            .collect())
    }

    /// Overwrite the agent and conversation tables
    pub async fn save_identities(
        &self,
        agents: &[AgentRecord],
        conversations: &[ConversationRecord],
    ) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write_table(AGENTS_TABLE, agents).await?;
        self.write_table(CONVERSATIONS_TABLE, conversations).await
    }

    pub async fn append_message(&self, record: MessageRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut messages: Vec<MessageRecord> = self.read_table(MESSAGES_TABLE).await?;
        messages.push(record);
        self.write_table(MESSAGES_TABLE, &messages).await
    }

    /// Drop everything tied to an agent whose persona was rewritten
    ///
    /// The agent record keeps its id under the current name; conversation and
    /// message rows involving the agent are deleted.
    pub async fn forget_agent(&self, agent_id: &str, name: &str) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut agents: Vec<AgentRecord> = self.read_table(AGENTS_TABLE).await?;
        match agents.iter_mut().find(|a| a.id == agent_id) {
            Some(record) => record.name = name.to_string(),
            None => agents.push(AgentRecord {
                name: name.to_string(),
                id: agent_id.to_string(),
            }),
        }
        self.write_table(AGENTS_TABLE, &agents).await?;

        let mut conversations: Vec<ConversationRecord> =
            self.read_table(CONVERSATIONS_TABLE).await?;
        conversations.retain(|c| !c.touches(agent_id));
        self.write_table(CONVERSATIONS_TABLE, &conversations).await?;

        let mut messages: Vec<MessageRecord> = self.read_table(MESSAGES_TABLE).await?;
        let before = messages.len();
        messages.retain(|m| !m.touches(agent_id));
        self.write_table(MESSAGES_TABLE, &messages).await?;

        debug!(
            agent = %name,
            dropped = before - messages.len(),
            "forgot conversations of updated agent"
        );
        Ok(())
    }

    /// Read a table; a missing or empty file is an empty table
    async fn read_table<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let path = self.dir.join(table);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AgencyError::storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            AgencyError::storage(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Replace a table atomically using a temp file
    async fn write_table<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            AgencyError::storage(format!(
                "Failed to create data directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let path = self.dir.join(table);
        let content = serde_json::to_string_pretty(rows)?;

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content).await.map_err(|e| {
            AgencyError::storage(format!("Failed to write {}: {}", temp_path.display(), e))
        })?;
        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            AgencyError::storage(format!("Failed to save {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}
