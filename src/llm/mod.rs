//! LLM module - reasoning backend integrations
//!
//! Provides the conversation backend abstraction with the OpenAI Assistants
//! API as the primary implementation.

pub mod openai;
pub mod traits;

pub use openai::OpenAiAssistants;
pub use traits::{ConversationBackend, Persona, PersonaSpec, Run, RunStatus, Turn, TurnContent};
