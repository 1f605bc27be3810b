//! Agent personas
//!
//! An agent is a graph participant bound to a backend persona: instructions,
//! model and tool set. It registers or refreshes that persona on startup.

use std::sync::Arc;

use tracing::info;

use crate::agent::delegate::AgentDelegate;
use crate::core::{Identity, Result};
use crate::llm::{ConversationBackend, PersonaSpec};
use crate::tools::{Tool, ToolSet};

/// Model used when an agent does not name one
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-2024-04-09";

/// A persona-bound participant of the agency
#[derive(Debug, Clone)]
pub struct Agent {
    identity: Identity,
    description: String,
    instructions: String,
    model: String,
    tools: ToolSet,
}

/// Outcome of initialising an agent against the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaSync {
    /// No persona existed; a new one was registered
    Created,
    /// The stored persona matched the local configuration
    Unchanged,
    /// The stored persona had drifted and was rewritten
    Updated,
}

/// Builder for creating Agents
pub struct AgentBuilder {
    name: String,
    description: String,
    instructions: String,
    model: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
}

impl AgentBuilder {
    /// Create a new builder with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instructions: String::new(),
            model: None,
            tools: Vec::new(),
        }
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the instructions
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Set the model to use
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add a tool
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Build the Agent, rejecting duplicate tool names
    pub fn build(self) -> Result<Agent> {
        let mut tools = ToolSet::new();
        for tool in self.tools {
            tools.register(tool)?;
        }

        Ok(Agent {
            identity: Identity::unregistered(self.name),
            description: self.description,
            instructions: self.instructions,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            tools,
        })
    }
}

impl Agent {
    /// Create a builder for more control
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Backend persona id, once registered
    pub fn id(&self) -> Option<&str> {
        self.identity.id.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Adopt a persona id resolved from persistence
    pub fn set_id(&mut self, id: Option<String>) {
        self.identity.id = id;
    }

    /// Register an additional tool after construction
    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        self.tools.register(tool)
    }

    /// Prefix the instructions with the agency mission
    pub fn prefix_instructions(&mut self, mission: &str) {
        self.instructions = format!("{}\n\n{}", mission, self.instructions);
    }

    /// Attributes the backend persona should carry
    pub fn persona_spec(&self) -> PersonaSpec {
        PersonaSpec {
            name: self.identity.name.clone(),
            description: self.description.clone(),
            instructions: self.instructions.clone(),
            model: self.model.clone(),
            tools: self.tools.definitions(),
        }
    }

    /// Register the persona, or refresh it when the stored copy has drifted
    ///
    /// A refresh is reported to the delegate so that state tied to the old
    /// persona can be discarded.
    pub async fn initialize(
        &mut self,
        backend: &dyn ConversationBackend,
        delegate: &dyn AgentDelegate,
    ) -> Result<PersonaSync> {
        let spec = self.persona_spec();

        let Some(id) = self.identity.id.clone() else {
            let persona = backend.create_persona(&spec).await?;
            info!(agent = %self.name(), persona = %persona.id, "registered persona");
            self.identity.id = Some(persona.id);
            return Ok(PersonaSync::Created);
        };

        let stored = backend.retrieve_persona(&id).await?;
        if !stored.drifted_from(&spec) {
            return Ok(PersonaSync::Unchanged);
        }

        backend.update_persona(&id, &spec).await?;
        info!(agent = %self.name(), persona = %id, "persona drifted, updated");
        delegate.on_agent_updated(self).await;
        Ok(PersonaSync::Updated)
    }
}
