//! Custom error types for the agency engine
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for agency operations
#[derive(Error, Debug)]
pub enum AgencyError {
    /// Configuration errors (missing agents, missing persona ids, bad definitions)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A message was addressed to a conversation it cannot be routed to
    #[error("Routing error: {0}")]
    Routing(String),

    /// The reasoning backend rejected a request or answered with something unusable
    #[error("Backend error: {0}")]
    Backend(String),

    /// The backend produced a turn whose content is not plain text
    #[error("Unsupported content: backend produced a '{0}' turn, only text is supported")]
    UnsupportedContent(String),

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for agency operations
pub type Result<T> = std::result::Result<T, AgencyError>;

impl AgencyError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a routing error
    pub fn routing(msg: impl Into<String>) -> Self {
        Self::Routing(msg.into())
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether this error is a routing rejection rather than a fault
    pub fn is_routing(&self) -> bool {
        matches!(self, Self::Routing(_))
    }
}
