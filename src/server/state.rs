//! Server state management

use std::sync::Arc;

use crate::agent::Agency;
use crate::server::broadcast::Broadcaster;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agency: Arc<Agency>,
    pub broadcaster: Arc<Broadcaster>,
}

impl AppState {
    /// The broadcaster must be the sink the agency was built with
    pub fn new(agency: Arc<Agency>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            agency,
            broadcaster,
        }
    }
}
