//! Agent module - the communication graph and its conversations
//!
//! Contains agents and their backend personas, the per-edge conversation run
//! loop, tool dispatch, and the agency that wires them together.

pub mod agency;
pub mod conversation;
pub mod definition;
pub mod delegate;
pub mod directory;
pub mod dispatcher;
pub mod persona;
pub mod run_state;

pub use agency::{Agency, AgencyBuilder, AgencyEvents, AgencyInfo, AgentInfo};
pub use conversation::Conversation;
pub use definition::AgencyDefinition;
pub use delegate::{AgentDelegate, ConversationDelegate, NotificationSink};
pub use directory::ConversationDirectory;
pub use dispatcher::ToolDispatcher;
pub use persona::{Agent, AgentBuilder, PersonaSync, DEFAULT_MODEL};
pub use run_state::{DelegationStack, RunPolicy, RunState, FAILED_RUN_MESSAGE};
