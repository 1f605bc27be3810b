//! Core module - shared infrastructure for the agency engine
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, RunConfig};
pub use error::{AgencyError, Result};
pub use types::*;
