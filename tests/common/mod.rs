//! Shared test harness
//!
//! A scripted in-memory conversation backend and a recording notification
//! sink, plus helpers building the maths agency used across the suites.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use agency::agent::{Agency, AgencyDefinition, Agent, NotificationSink, RunPolicy};
use agency::core::{MessageView, Result, ToolCall, ToolOutput};
use agency::llm::{ConversationBackend, Persona, PersonaSpec, Run, RunStatus, Turn, TurnContent};
use agency::storage::JsonStore;
use agency::tools::OperationTool;
use agency::AgencyError;
use async_trait::async_trait;

/// What a persona does the next time one of its runs is polled
#[derive(Debug, Clone)]
pub enum Step {
    /// Complete with a text reply
    Reply(String),
    /// End the run with a failure status
    Fail,
    /// Ask for tool calls `(name, arguments)`; the run resumes once outputs arrive
    Call(Vec<(String, String)>),
    /// Complete with an image reply
    NonText,
    /// Fail the status poll itself with a transport error
    Disconnect,
}

impl Step {
    pub fn reply(text: &str) -> Self {
        Step::Reply(text.to_string())
    }

    pub fn call(name: &str, arguments: serde_json::Value) -> Self {
        Step::Call(vec![(name.to_string(), arguments.to_string())])
    }

    pub fn talk(recipient: &str, message: &str) -> Self {
        Self::call(
            "TalkToAgent",
            serde_json::json!({ "recipient": recipient, "message": message }),
        )
    }
}

#[derive(Debug)]
struct RunRecord {
    context: String,
    persona: String,
    status: RunStatus,
    calls: Vec<ToolCall>,
}

#[derive(Default)]
struct BackendState {
    personas: HashMap<String, PersonaSpec>,
    scripts: HashMap<String, VecDeque<Step>>,
    contexts: HashMap<String, Vec<Turn>>,
    runs: HashMap<String, RunRecord>,
    runs_created: HashMap<String, usize>,
    submissions: Vec<(String, Vec<ToolOutput>)>,
    personas_created: usize,
    personas_updated: usize,
    contexts_created: usize,
}

/// In-memory backend following per-persona scripts
#[derive(Default)]
pub struct ScriptedBackend {
    state: Mutex<BackendState>,
    ids: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Append steps to the script of the persona named `name`
    pub fn script(&self, name: &str, steps: impl IntoIterator<Item = Step>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(name.to_string())
            .or_default()
            .extend(steps);
    }

    pub fn runs_created(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .runs_created
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Output batches submitted on runs of the persona named `name`
    pub fn submissions(&self, name: &str) -> Vec<Vec<ToolOutput>> {
        self.state
            .lock()
            .unwrap()
            .submissions
            .iter()
            .filter(|(persona, _)| persona == name)
            .map(|(_, outputs)| outputs.clone())
            .collect()
    }

    pub fn personas_created(&self) -> usize {
        self.state.lock().unwrap().personas_created
    }

    pub fn personas_updated(&self) -> usize {
        self.state.lock().unwrap().personas_updated
    }

    pub fn contexts_created(&self) -> usize {
        self.state.lock().unwrap().contexts_created
    }

    /// Stored persona spec, by name
    pub fn persona(&self, name: &str) -> Option<PersonaSpec> {
        self.state
            .lock()
            .unwrap()
            .personas
            .values()
            .find(|spec| spec.name == name)
            .cloned()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.ids.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn snapshot(id: &str, record: &RunRecord) -> Run {
        Run {
            id: id.to_string(),
            status: record.status.clone(),
            required_action: record.calls.clone(),
        }
    }
}

fn persona_of(id: &str, spec: &PersonaSpec) -> Persona {
    Persona {
        id: id.to_string(),
        name: spec.name.clone(),
        description: spec.description.clone(),
        instructions: spec.instructions.clone(),
        model: spec.model.clone(),
        tool_count: spec.tools.len(),
    }
}

#[async_trait]
impl ConversationBackend for ScriptedBackend {
    async fn create_persona(&self, spec: &PersonaSpec) -> Result<Persona> {
        let id = self.next_id("asst");
        let mut state = self.state.lock().unwrap();
        state.personas_created += 1;
        state.personas.insert(id.clone(), spec.clone());
        Ok(persona_of(&id, spec))
    }

    async fn retrieve_persona(&self, persona_id: &str) -> Result<Persona> {
        let state = self.state.lock().unwrap();
        state
            .personas
            .get(persona_id)
            .map(|spec| persona_of(persona_id, spec))
            .ok_or_else(|| AgencyError::backend(format!("no assistant {}", persona_id)))
    }

    async fn update_persona(&self, persona_id: &str, spec: &PersonaSpec) -> Result<Persona> {
        let mut state = self.state.lock().unwrap();
        state.personas_updated += 1;
        state.personas.insert(persona_id.to_string(), spec.clone());
        Ok(persona_of(persona_id, spec))
    }

    async fn create_context(&self) -> Result<String> {
        let id = self.next_id("thread");
        let mut state = self.state.lock().unwrap();
        state.contexts_created += 1;
        state.contexts.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn retrieve_context(&self, context_id: &str) -> Result<String> {
        let state = self.state.lock().unwrap();
        if state.contexts.contains_key(context_id) {
            Ok(context_id.to_string())
        } else {
            Err(AgencyError::backend(format!("no thread {}", context_id)))
        }
    }

    async fn add_user_turn(&self, context_id: &str, text: &str) -> Result<()> {
        let id = self.next_id("msg");
        let mut state = self.state.lock().unwrap();
        let turns = state
            .contexts
            .get_mut(context_id)
            .ok_or_else(|| AgencyError::backend(format!("no thread {}", context_id)))?;
        turns.insert(
            0,
            Turn {
                id,
                role: "user".into(),
                content: vec![TurnContent::Text(text.to_string())],
            },
        );
        Ok(())
    }

    async fn create_run(&self, context_id: &str, persona_id: &str) -> Result<Run> {
        let id = self.next_id("run");
        let mut state = self.state.lock().unwrap();
        let persona = state
            .personas
            .get(persona_id)
            .map(|spec| spec.name.clone())
            .ok_or_else(|| AgencyError::backend(format!("no assistant {}", persona_id)))?;
        *state.runs_created.entry(persona.clone()).or_default() += 1;

        let record = RunRecord {
            context: context_id.to_string(),
            persona,
            status: RunStatus::Queued,
            calls: Vec::new(),
        };
        let run = Self::snapshot(&id, &record);
        state.runs.insert(id, record);
        Ok(run)
    }

    async fn retrieve_run(&self, _context_id: &str, run_id: &str) -> Result<Run> {
        let id = self.next_id("msg");
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let record = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| AgencyError::backend(format!("no run {}", run_id)))?;

        if record.status.is_pending() {
            let step = state
                .scripts
                .get_mut(&record.persona)
                .and_then(|script| script.pop_front())
                .unwrap_or_else(|| Step::reply("ok"));

            let content = match step {
                Step::Reply(text) => Some(TurnContent::Text(text)),
                Step::NonText => Some(TurnContent::Other("image_file".into())),
                Step::Disconnect => return Err(AgencyError::backend("connection reset")),
                Step::Fail => {
                    record.status = RunStatus::Failed("failed".into());
                    None
                }
                Step::Call(calls) => {
                    record.status = RunStatus::RequiresAction;
                    record.calls = calls
                        .into_iter()
                        .enumerate()
                        .map(|(i, (name, arguments))| {
                            ToolCall::new(format!("call_{}_{}", run_id, i), name, arguments)
                        })
                        .collect();
                    None
                }
            };

            if let Some(content) = content {
                record.status = RunStatus::Completed;
                if let Some(turns) = state.contexts.get_mut(&record.context) {
                    turns.insert(
                        0,
                        Turn {
                            id,
                            role: "assistant".into(),
                            content: vec![content],
                        },
                    );
                }
            }
        }

        Ok(Self::snapshot(run_id, record))
    }

    async fn list_turns(&self, context_id: &str) -> Result<Vec<Turn>> {
        let state = self.state.lock().unwrap();
        state
            .contexts
            .get(context_id)
            .cloned()
            .ok_or_else(|| AgencyError::backend(format!("no thread {}", context_id)))
    }

    async fn submit_tool_outputs(
        &self,
        _context_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let record = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| AgencyError::backend(format!("no run {}", run_id)))?;
        if record.status != RunStatus::RequiresAction {
            return Err(AgencyError::backend("run is not waiting for tool outputs"));
        }

        record.status = RunStatus::InProgress;
        record.calls.clear();
        state
            .submissions
            .push((record.persona.clone(), outputs.to_vec()));
        Ok(Self::snapshot(run_id, record))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Sink keeping every published notification
#[derive(Default)]
pub struct RecordingSink {
    published: Mutex<Vec<(String, MessageView)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn published(&self) -> Vec<(String, MessageView)> {
        self.published.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn publish(&self, conversation_id: &str, message: &MessageView) {
        self.published
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), message.clone()));
    }
}

/// MainAgent talks to the user and delegates to MathAgent
pub fn maths_definition() -> AgencyDefinition {
    AgencyDefinition::new("Maths agency")
        .agent(
            Agent::builder("MainAgent")
                .description("Talks to the user")
                .instructions("Send maths questions to MathAgent")
                .build()
                .unwrap(),
        )
        .agent(
            Agent::builder("MathAgent")
                .description("Solves operations")
                .instructions("Use OperationTool")
                .tool(Arc::new(OperationTool::new()))
                .build()
                .unwrap(),
        )
        .edges("User", ["MainAgent"])
        .edges("MainAgent", ["MathAgent"])
}

/// Build an agency with no waiting in its run loop
pub async fn build_agency(
    definition: AgencyDefinition,
    backend: Arc<ScriptedBackend>,
    dir: &Path,
    sink: Option<Arc<dyn NotificationSink>>,
) -> Result<Arc<Agency>> {
    let mut builder = Agency::builder(definition)
        .backend(backend)
        .store(Arc::new(JsonStore::open(dir)))
        .policy(RunPolicy::immediate());
    if let Some(sink) = sink {
        builder = builder.sink(sink);
    }
    builder.build().await
}

/// Same as [`build_agency`] with a custom run policy
pub async fn build_agency_with_policy(
    definition: AgencyDefinition,
    backend: Arc<ScriptedBackend>,
    dir: &Path,
    policy: RunPolicy,
) -> Result<Arc<Agency>> {
    Agency::builder(definition)
        .backend(backend)
        .store(Arc::new(JsonStore::open(dir)))
        .policy(policy)
        .build()
        .await
}
