//! Agency - the communication graph
//!
//! Builds every agent and one conversation per permitted edge, resolving
//! persisted identities so conversations resume across restarts. Messages
//! flow out through [`AgencyEvents`], which persists and publishes them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::agent::conversation::Conversation;
use crate::agent::definition::AgencyDefinition;
use crate::agent::delegate::{AgentDelegate, ConversationDelegate, NotificationSink};
use crate::agent::directory::ConversationDirectory;
use crate::agent::persona::Agent;
use crate::agent::run_state::RunPolicy;
use crate::core::{AgencyError, Identity, Message, Result};
use crate::llm::ConversationBackend;
use crate::storage::{AgentRecord, ConversationRecord, JsonStore, MessageRecord};
use crate::tools::TalkToAgent;

/// Event port shared by every agent and conversation of an agency
pub struct AgencyEvents {
    store: Arc<JsonStore>,
    sink: Option<Arc<dyn NotificationSink>>,
}

impl AgencyEvents {
    pub fn new(store: Arc<JsonStore>, sink: Option<Arc<dyn NotificationSink>>) -> Self {
        Self { store, sink }
    }
}

#[async_trait]
impl ConversationDelegate for AgencyEvents {
    async fn on_new_message(&self, conversation_id: &str, message: &Message) {
        let record = MessageRecord::from_message(conversation_id, message);
        if let Err(e) = self.store.append_message(record).await {
            warn!(conversation = %conversation_id, "failed to persist message: {}", e);
        }
        if let Some(sink) = &self.sink {
            sink.publish(conversation_id, &message.view());
        }
    }
}

#[async_trait]
impl AgentDelegate for AgencyEvents {
    async fn on_agent_updated(&self, agent: &Agent) {
        let Some(id) = agent.id() else {
            return;
        };
        if let Err(e) = self.store.forget_agent(id, agent.name()).await {
            warn!(agent = %agent.name(), "failed to drop conversations of updated agent: {}", e);
        }
    }
}

/// Public summary of an agency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgencyInfo {
    pub name: String,
    pub mission: Option<String>,
    pub agents: Vec<AgentInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentInfo {
    pub name: String,
    pub id: Option<String>,
}

/// A built agency
pub struct Agency {
    name: String,
    mission: Option<String>,
    user: Identity,
    agents: Vec<Arc<Agent>>,
    agents_by_name: HashMap<String, Arc<Agent>>,
    conversations: Vec<Arc<Conversation>>,
    conversations_by_id: HashMap<String, Arc<Conversation>>,
    directory: ConversationDirectory,
}

/// Builder wiring a definition to its backend, store and sink
pub struct AgencyBuilder {
    definition: AgencyDefinition,
    backend: Option<Arc<dyn ConversationBackend>>,
    store: Option<Arc<JsonStore>>,
    sink: Option<Arc<dyn NotificationSink>>,
    policy: RunPolicy,
}

impl AgencyBuilder {
    pub fn new(definition: AgencyDefinition) -> Self {
        Self {
            definition,
            backend: None,
            store: None,
            sink: None,
            policy: RunPolicy::default(),
        }
    }

    pub fn backend(mut self, backend: Arc<dyn ConversationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn store(mut self, store: Arc<JsonStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Receiver of live message notifications
    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Initialise every agent and conversation and persist their identities
    pub async fn build(self) -> Result<Arc<Agency>> {
        let definition = self.definition;
        definition.validate()?;
        let backend = self
            .backend
            .ok_or_else(|| AgencyError::config("Agency needs a conversation backend"))?;
        let store = self
            .store
            .ok_or_else(|| AgencyError::config("Agency needs a store"))?;
        let events = Arc::new(AgencyEvents::new(store.clone(), self.sink));
        let directory = ConversationDirectory::new();

        let saved_ids: HashMap<String, String> = store
            .load_agents()
            .await?
            .into_iter()
            .map(|record| (record.name, record.id))
            .collect();

        let mut agents = Vec::with_capacity(definition.agents.len());
        for mut agent in definition.agents.iter().cloned() {
            agent.set_id(saved_ids.get(agent.name()).cloned());
            if !definition.recipients_of(agent.name()).is_empty() {
                agent.add_tool(Arc::new(TalkToAgent::new(
                    directory.handle(),
                    self.policy.max_delegation_depth,
                )))?;
            }
            if let Some(mission) = &definition.mission {
                agent.prefix_instructions(mission);
            }
            let sync = agent.initialize(backend.as_ref(), events.as_ref()).await?;
            info!(agent = %agent.name(), ?sync, "agent ready");
            agents.push(Arc::new(agent));
        }

        let agents_by_name: HashMap<String, Arc<Agent>> = agents
            .iter()
            .map(|agent| (agent.name().to_string(), agent.clone()))
            .collect();

        let user = Identity::user();
        let mut participants: HashMap<String, Identity> = HashMap::new();
        participants.insert(user.persisted_id(), user.clone());
        for agent in &agents {
            participants.insert(agent.identity().persisted_id(), agent.identity().clone());
        }

        // Read after agent initialisation: a persona update drops rows.
        let saved_conversations = store.load_conversations().await?;

        let senders = std::iter::once(user.clone())
            .chain(agents.iter().map(|agent| agent.identity().clone()));
        let mut conversations = Vec::new();
        let mut conversations_by_id = HashMap::new();

        for sender in senders {
            for recipient_name in definition.recipients_of(&sender.name) {
                let recipient = agents_by_name
                    .get(recipient_name)
                    .cloned()
                    .ok_or_else(|| {
                        AgencyError::config(format!("Unknown recipient '{}'", recipient_name))
                    })?;

                let saved_id = saved_conversations
                    .iter()
                    .find(|record| {
                        record.sender_agent == sender.persisted_id()
                            && Some(record.recipient_agent.as_str()) == recipient.id()
                    })
                    .map(|record| record.id.clone());

                let messages = match &saved_id {
                    Some(id) => store
                        .load_messages(id)
                        .await?
                        .into_iter()
                        .map(|record| restore_message(record, &participants))
                        .collect(),
                    None => Vec::new(),
                };

                let conversation = Conversation::new(
                    sender.clone(),
                    recipient,
                    backend.clone(),
                    events.clone(),
                    self.policy.clone(),
                )
                .restore(saved_id, messages);
                let id = conversation.initialize().await?;
                let conversation = Arc::new(conversation);

                directory.insert(conversation.clone());
                conversations_by_id.insert(id, conversation.clone());
                conversations.push(conversation);
            }
        }

        let agent_records: Vec<AgentRecord> = agents
            .iter()
            .map(|agent| AgentRecord {
                name: agent.name().to_string(),
                id: agent.identity().persisted_id(),
            })
            .collect();
        let conversation_records: Vec<ConversationRecord> = conversations
            .iter()
            .map(|conversation| ConversationRecord {
                id: conversation.id().unwrap_or_default(),
                sender_agent: conversation.sender().persisted_id(),
                recipient_agent: conversation.recipient().identity().persisted_id(),
            })
            .collect();
        store
            .save_identities(&agent_records, &conversation_records)
            .await?;

        info!(
            agency = %definition.name,
            agents = agents.len(),
            conversations = conversations.len(),
            "agency ready"
        );

        Ok(Arc::new(Agency {
            name: definition.name,
            mission: definition.mission,
            user,
            agents,
            agents_by_name,
            conversations,
            conversations_by_id,
            directory,
        }))
    }
}

/// Rebuild a logged message, naming participants by their persisted id when
/// they are no longer part of the agency
fn restore_message(record: MessageRecord, participants: &HashMap<String, Identity>) -> Message {
    let resolve = |id: &str| {
        participants
            .get(id)
            .cloned()
            .unwrap_or_else(|| Identity::new(id, id))
    };
    Message {
        from: resolve(&record.from),
        to: resolve(&record.to),
        id: record.id,
        date: record.date,
        kind: record.kind,
        content: record.content,
    }
}

impl Agency {
    pub fn builder(definition: AgencyDefinition) -> AgencyBuilder {
        AgencyBuilder::new(definition)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mission(&self) -> Option<&str> {
        self.mission.as_deref()
    }

    pub fn user(&self) -> &Identity {
        &self.user
    }

    /// Agents in declaration order
    pub fn agents(&self) -> &[Arc<Agent>] {
        &self.agents
    }

    /// Conversations in build order: the user's first, then each agent's
    pub fn conversations(&self) -> &[Arc<Conversation>] {
        &self.conversations
    }

    pub fn conversation(&self, id: &str) -> Option<Arc<Conversation>> {
        self.conversations_by_id.get(id).cloned()
    }

    pub fn find_agent(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents_by_name.get(name).cloned()
    }

    pub fn find_conversation(&self, sender: &str, recipient: &str) -> Option<Arc<Conversation>> {
        self.directory.get(sender, recipient)
    }

    /// Conversations the user may send to
    pub fn user_conversations(&self) -> Vec<Arc<Conversation>> {
        self.conversations
            .iter()
            .filter(|conversation| conversation.sender().is_user())
            .cloned()
            .collect()
    }

    /// Resolve a conversation the user is allowed to send to
    pub fn user_conversation(&self, conversation_id: &str) -> Result<Arc<Conversation>> {
        let conversation = self.conversation(conversation_id).ok_or_else(|| {
            AgencyError::routing(format!("Conversation '{}' not found", conversation_id))
        })?;
        if !conversation.sender().is_user() {
            return Err(AgencyError::routing(format!(
                "Conversation '{}' does not belong to the user",
                conversation_id
            )));
        }
        Ok(conversation)
    }

    /// Send a user message to one of the user's conversations
    pub async fn route_user_message(&self, conversation_id: &str, text: &str) -> Result<String> {
        let conversation = self.user_conversation(conversation_id)?;
        conversation.send(text).await
    }

    pub fn info(&self) -> AgencyInfo {
        AgencyInfo {
            name: self.name.clone(),
            mission: self.mission.clone(),
            agents: self
                .agents
                .iter()
                .map(|agent| AgentInfo {
                    name: agent.name().to_string(),
                    id: agent.id().map(str::to_string),
                })
                .collect(),
        }
    }
}

impl std::fmt::Debug for Agency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agency")
            .field("name", &self.name)
            .field("agents", &self.agents.len())
            .field("conversations", &self.directory)
            .finish()
    }
}
