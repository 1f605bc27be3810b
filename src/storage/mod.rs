//! Storage module - persistence of identities and transcripts
//!
//! Agent ids, conversation ids and every logged message are kept in JSON
//! tables so an agency resumes its conversations across restarts.

pub mod json_store;

pub use json_store::{AgentRecord, ConversationRecord, JsonStore, MessageRecord};
