//! Conversation run loop
//!
//! A conversation is one directed edge of the agency: a sender talking to a
//! recipient agent over a backend context. `send` drives a backend run to
//! completion, resolving tool calls on the way and retrying failed runs.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::agent::delegate::ConversationDelegate;
use crate::agent::dispatcher::ToolDispatcher;
use crate::agent::persona::Agent;
use crate::agent::run_state::{DelegationStack, RunPolicy, RunState, FAILED_RUN_MESSAGE};
use crate::core::{AgencyError, Identity, Message, MessageType, Result, ToolCall, ToolOutput};
use crate::llm::{ConversationBackend, Run, RunStatus, TurnContent};

#[derive(Debug, Default)]
struct ConversationState {
    id: Option<String>,
    messages: Vec<Message>,
    current_run: Option<RunState>,
}

/// How one run ended
enum RunOutcome {
    Replied(String),
    Failed(RunStatus),
}

/// A directed conversation between a sender and a recipient agent
pub struct Conversation {
    sender: Identity,
    recipient: Arc<Agent>,
    backend: Arc<dyn ConversationBackend>,
    delegate: Arc<dyn ConversationDelegate>,
    policy: RunPolicy,
    state: Mutex<ConversationState>,
}

impl Conversation {
    /// Create a conversation with no backend context yet
    pub fn new(
        sender: Identity,
        recipient: Arc<Agent>,
        backend: Arc<dyn ConversationBackend>,
        delegate: Arc<dyn ConversationDelegate>,
        policy: RunPolicy,
    ) -> Self {
        Self {
            sender,
            recipient,
            backend,
            delegate,
            policy,
            state: Mutex::new(ConversationState::default()),
        }
    }

    /// Resume a persisted conversation
    pub fn restore(self, id: Option<String>, messages: Vec<Message>) -> Self {
        {
            let mut state = self.state.lock();
            state.id = id;
            state.messages = messages;
        }
        self
    }

    pub fn sender(&self) -> &Identity {
        &self.sender
    }

    pub fn recipient(&self) -> &Arc<Agent> {
        &self.recipient
    }

    /// `Sender->Recipient`, unique within an agency
    pub fn key(&self) -> String {
        format!("{}->{}", self.sender.name, self.recipient.name())
    }

    /// Backend context id, once created
    pub fn id(&self) -> Option<String> {
        self.state.lock().id.clone()
    }

    /// Snapshot of the transcript
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    /// The run in flight, if any
    pub fn current_run(&self) -> Option<RunState> {
        self.state.lock().current_run.clone()
    }

    /// Create the backend context, or check that the stored one still exists
    pub async fn initialize(&self) -> Result<String> {
        match self.id() {
            Some(id) => self.backend.retrieve_context(&id).await,
            None => {
                let id = self.backend.create_context().await?;
                debug!(conversation = %self.key(), context = %id, "created context");
                self.state.lock().id = Some(id.clone());
                Ok(id)
            }
        }
    }

    /// Send a top-level message and wait for the recipient's reply
    pub async fn send(&self, text: &str) -> Result<String> {
        self.send_within(text, &DelegationStack::root()).await
    }

    /// Send a message on behalf of the conversations waiting in `stack`
    ///
    /// The run state only lives for the duration of the call, whatever the
    /// outcome.
    pub async fn send_within(&self, text: &str, stack: &DelegationStack) -> Result<String> {
        let result = self.take_turn(text, stack).await;
        self.state.lock().current_run = None;
        result
    }

    async fn take_turn(&self, text: &str, stack: &DelegationStack) -> Result<String> {
        let Some(persona_id) = self.recipient.id().map(str::to_string) else {
            return Err(AgencyError::config(format!(
                "Agent '{}' has no persona id; initialise the agency first",
                self.recipient.name()
            )));
        };
        let context_id = match self.id() {
            Some(id) => id,
            None => self.initialize().await?,
        };
        let stack = stack.enter(self.key());

        let mut attempt = 1;
        loop {
            self.log(MessageType::Text, text, false).await;
            self.backend.add_user_turn(&context_id, text).await?;
            let run = self.backend.create_run(&context_id, &persona_id).await?;
            info!(conversation = %self.key(), run = %run.id, attempt, "started run");

            match self.drive(&context_id, run, attempt, &stack).await? {
                RunOutcome::Replied(reply) => return Ok(reply),
                RunOutcome::Failed(status) if attempt < self.policy.max_attempts => {
                    warn!(
                        conversation = %self.key(),
                        status = %status,
                        attempt,
                        "run failed, retrying in {:?}",
                        self.policy.retry_backoff
                    );
                    tokio::time::sleep(self.policy.retry_backoff).await;
                    attempt += 1;
                }
                RunOutcome::Failed(status) => {
                    warn!(conversation = %self.key(), status = %status, attempt, "run failed, giving up");
                    self.log(MessageType::Text, FAILED_RUN_MESSAGE, true).await;
                    return Ok(FAILED_RUN_MESSAGE.to_string());
                }
            }
        }
    }

    /// Poll a run until it settles, resolving tool calls as they come
    async fn drive(
        &self,
        context_id: &str,
        mut run: Run,
        attempt: u32,
        stack: &DelegationStack,
    ) -> Result<RunOutcome> {
        loop {
            self.track(&run, attempt);
            while run.status.is_pending() {
                tokio::time::sleep(self.policy.poll_interval).await;
                run = self.backend.retrieve_run(context_id, &run.id).await?;
                debug!(conversation = %self.key(), run = %run.id, status = %run.status, "polled run");
                self.track(&run, attempt);
            }

            match run.status.clone() {
                RunStatus::Completed => {
                    self.state.lock().current_run = None;
                    let reply = self.extract_reply(context_id).await?;
                    self.log(MessageType::Text, &reply, true).await;
                    return Ok(RunOutcome::Replied(reply));
                }
                RunStatus::RequiresAction => {
                    let outputs = self
                        .resolve_actions(&run.required_action, context_id, stack)
                        .await;
                    run = self
                        .backend
                        .submit_tool_outputs(context_id, &run.id, &outputs)
                        .await?;
                }
                status => {
                    self.state.lock().current_run = None;
                    return Ok(RunOutcome::Failed(status));
                }
            }
        }
    }

    /// Run every pending call in order, logging each call and its output
    async fn resolve_actions(
        &self,
        calls: &[ToolCall],
        context_id: &str,
        stack: &DelegationStack,
    ) -> Vec<ToolOutput> {
        let dispatcher = ToolDispatcher::new(&self.recipient);
        let mut outputs = Vec::with_capacity(calls.len());

        for call in calls {
            self.log(MessageType::Action, &ToolDispatcher::describe(call), true)
                .await;
            let output = dispatcher.dispatch(call, context_id, stack).await;
            self.log(
                MessageType::ActionResponse,
                &ToolDispatcher::describe_output(call, &output),
                true,
            )
            .await;
            outputs.push(ToolOutput::new(&call.id, output));
        }

        outputs
    }

    /// Text of the newest turn of the context
    async fn extract_reply(&self, context_id: &str) -> Result<String> {
        let turns = self.backend.list_turns(context_id).await?;
        let content = turns
            .into_iter()
            .next()
            .and_then(|turn| turn.content.into_iter().next());

        match content {
            Some(TurnContent::Text(text)) => Ok(text),
            Some(TurnContent::Other(kind)) => {
                error!(conversation = %self.key(), kind = %kind, "reply is not text");
                Err(AgencyError::UnsupportedContent(kind))
            }
            None => Err(AgencyError::backend("run completed without a reply")),
        }
    }

    fn track(&self, run: &Run, attempt: u32) {
        let mut state = self.state.lock();
        let current = state
            .current_run
            .get_or_insert_with(|| RunState::new(&run.id, run.status.clone(), attempt));
        current.run_id = run.id.clone();
        current.status = run.status.clone();
        current.pending_tool_calls = run.required_action.clone();
        current.attempt = attempt;
    }

    /// Append to the transcript and report to the delegate
    ///
    /// Inverted messages travel from the recipient back to the sender.
    async fn log(&self, kind: MessageType, content: &str, inverted: bool) {
        let recipient = self.recipient.identity().clone();
        let (from, to) = if inverted {
            (recipient, self.sender.clone())
        } else {
            (self.sender.clone(), recipient)
        };
        let message = Message::new(kind, content, from, to);

        let conversation_id = {
            let mut state = self.state.lock();
            state.messages.push(message.clone());
            state.id.clone().unwrap_or_default()
        };
        self.delegate
            .on_new_message(&conversation_id, &message)
            .await;
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("key", &self.key())
            .field("id", &self.id())
            .finish()
    }
}
