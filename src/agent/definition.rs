//! Agency definition
//!
//! The agents of an agency and who may talk to whom, built in code or loaded
//! from a TOML file:
//!
//! ```toml
//! name = "Maths agency"
//! mission = "Help students with their maths homework"
//!
//! [[agents]]
//! name = "MainAgent"
//! description = "Talks to the user"
//! instructions_file = "main.md"
//!
//! [[agents]]
//! name = "MathAgent"
//! instructions = "Solve the operations you are given"
//! tools = ["OperationTool"]
//!
//! [communications]
//! User = ["MainAgent"]
//! MainAgent = ["MathAgent"]
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::agent::persona::Agent;
use crate::core::{AgencyError, Result, USER_NAME};
use crate::tools::{OperationTool, Tool};

/// Agents and communication edges of an agency
#[derive(Debug, Clone)]
pub struct AgencyDefinition {
    pub name: String,
    pub mission: Option<String>,
    pub agents: Vec<Agent>,
    /// Sender name to ordered recipient names
    pub communications: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgencyFile {
    name: String,
    #[serde(default)]
    mission: Option<String>,
    #[serde(default)]
    agents: Vec<AgentFile>,
    #[serde(default)]
    communications: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgentFile {
    name: String,
    description: Option<String>,
    description_file: Option<PathBuf>,
    instructions: Option<String>,
    instructions_file: Option<PathBuf>,
    model: Option<String>,
    #[serde(default)]
    tools: Vec<String>,
}

/// Tool from the built-in catalog
pub fn builtin_tool(name: &str) -> Option<Arc<dyn Tool>> {
    match name {
        "OperationTool" => Some(Arc::new(OperationTool::new())),
        _ => None,
    }
}

impl AgencyDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mission: None,
            agents: Vec::new(),
            communications: Vec::new(),
        }
    }

    /// Shared mission prefixed to every agent's instructions
    pub fn mission(mut self, mission: impl Into<String>) -> Self {
        self.mission = Some(mission.into());
        self
    }

    pub fn agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    /// Allow `sender` to open conversations with `recipients`, in order
    pub fn edges<I, S>(mut self, sender: impl Into<String>, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sender = sender.into();
        let recipients: Vec<String> = recipients.into_iter().map(Into::into).collect();
        match self.communications.iter_mut().find(|(s, _)| *s == sender) {
            Some((_, existing)) => existing.extend(recipients),
            None => self.communications.push((sender, recipients)),
        }
        self
    }

    /// Recipients reachable from `sender`, in declaration order
    pub fn recipients_of(&self, sender: &str) -> &[String] {
        self.communications
            .iter()
            .find(|(s, _)| s == sender)
            .map(|(_, r)| r.as_slice())
            .unwrap_or(&[])
    }

    /// Check names and edges
    pub fn validate(&self) -> Result<()> {
        if self.agents.is_empty() {
            return Err(AgencyError::config(format!(
                "Agency '{}' declares no agents",
                self.name
            )));
        }

        let mut names = HashSet::new();
        names.insert(USER_NAME);
        for agent in &self.agents {
            if !names.insert(agent.name()) {
                return Err(AgencyError::config(format!(
                    "Agent name '{}' is used more than once",
                    agent.name()
                )));
            }
        }

        for (sender, recipients) in &self.communications {
            if !names.contains(sender.as_str()) {
                return Err(AgencyError::config(format!(
                    "Communication sender '{}' is not an agent of the agency",
                    sender
                )));
            }
            let mut seen = HashSet::new();
            for recipient in recipients {
                if !seen.insert(recipient.as_str()) {
                    return Err(AgencyError::config(format!(
                        "'{}' is listed more than once as a recipient of '{}'",
                        recipient, sender
                    )));
                }
                if recipient == USER_NAME {
                    return Err(AgencyError::config(format!(
                        "'{}' cannot receive conversations from '{}'",
                        USER_NAME, sender
                    )));
                }
                if !names.contains(recipient.as_str()) {
                    return Err(AgencyError::config(format!(
                        "Communication recipient '{}' is not an agent of the agency",
                        recipient
                    )));
                }
            }
        }

        Ok(())
    }

    /// Load a definition from a TOML file; referenced files resolve next to it
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AgencyError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml(&content, base)
    }

    /// Parse a definition, resolving `*_file` entries against `base`
    pub fn from_toml(content: &str, base: &Path) -> Result<Self> {
        let file: AgencyFile = toml::from_str(content)
            .map_err(|e| AgencyError::config(format!("Invalid agency definition: {}", e)))?;

        let mut definition = Self::new(file.name);
        definition.mission = file.mission.filter(|m| !m.trim().is_empty());

        for entry in file.agents {
            let description = text_or_file(
                &entry.name,
                "description",
                entry.description,
                entry.description_file,
                base,
            )?;
            let instructions = text_or_file(
                &entry.name,
                "instructions",
                entry.instructions,
                entry.instructions_file,
                base,
            )?;

            let mut builder = Agent::builder(&entry.name)
                .description(description)
                .instructions(instructions);
            if let Some(model) = entry.model {
                builder = builder.model(model);
            }
            for tool_name in &entry.tools {
                let tool = builtin_tool(tool_name).ok_or_else(|| {
                    AgencyError::config(format!(
                        "Agent '{}' uses unknown tool '{}'",
                        entry.name, tool_name
                    ))
                })?;
                builder = builder.tool(tool);
            }
            definition.agents.push(builder.build()?);
        }

        for (sender, recipients) in file.communications {
            definition = definition.edges(sender, recipients);
        }

        Ok(definition)
    }
}

fn text_or_file(
    agent: &str,
    field: &str,
    text: Option<String>,
    file: Option<PathBuf>,
    base: &Path,
) -> Result<String> {
    match (text, file) {
        (Some(_), Some(_)) => Err(AgencyError::config(format!(
            "Agent '{}' sets both {} and {}_file",
            agent, field, field
        ))),
        (Some(text), None) => Ok(text),
        (None, Some(file)) => {
            let path = base.join(file);
            std::fs::read_to_string(&path).map_err(|e| {
                AgencyError::config(format!(
                    "Failed to read {} of '{}' from {}: {}",
                    field,
                    agent,
                    path.display(),
                    e
                ))
            })
        }
        (None, None) => Ok(String::new()),
    }
}
