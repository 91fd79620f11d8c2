//! Application context shared by every handler through axum state.

use std::sync::Arc;

use mc_core::config::Config;
use mc_ingest::Orchestrator;

/// Immutable infrastructure built once at startup.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub orchestrator: Orchestrator,
}

impl AppContext {
    pub fn new(config: Arc<Config>, orchestrator: Orchestrator) -> Self {
        Self {
            config,
            orchestrator,
        }
    }
}
