//! Agency - Multi-Agent Conversation Engine
//!
//! Runs a fixed graph of assistant agents on a hosted reasoning backend. The
//! user talks to entry agents; agents delegate to each other through a
//! built-in tool, and every conversation is persisted and streamed live.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Conversation backend abstraction with an OpenAI Assistants client
//! - **Tools**: Tool trait, per-agent tool sets, and the built-in tools
//! - **Agent**: Agents, the conversation run loop, and the agency graph
//! - **Storage**: JSON tables for identities and transcripts
//! - **Server**: HTTP API with live SSE notifications
//! - **CLI**: Terminal REPL over the user's conversations
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use agency::agent::{Agency, AgencyDefinition, Agent};
//! use agency::llm::OpenAiAssistants;
//! use agency::storage::JsonStore;
//! use agency::tools::OperationTool;
//! use agency::Config;
//!
//! #[tokio::main]
//! async fn main() -> agency::Result<()> {
//!     let config = Config::load();
//!     let definition = AgencyDefinition::new("Maths agency")
//!         .agent(Agent::builder("MainAgent").instructions("Talk to the user").build()?)
//!         .agent(
//!             Agent::builder("MathAgent")
//!                 .instructions("Solve operations")
//!                 .tool(Arc::new(OperationTool::new()))
//!                 .build()?,
//!         )
//!         .edges("User", ["MainAgent"])
//!         .edges("MainAgent", ["MathAgent"]);
//!
//!     let agency = Agency::builder(definition)
//!         .backend(Arc::new(OpenAiAssistants::from_config(&config)?))
//!         .store(Arc::new(JsonStore::open("db")))
//!         .build()
//!         .await?;
//!
//!     let reply = agency.user_conversations()[0].send("What is 6 times 7?").await?;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod server;
pub mod storage;
pub mod tools;

// Re-export commonly used items
pub use agent::Agency;
pub use cli::Repl;
pub use core::{AgencyError, Config, Result};
