use std::sync::Arc;

use parking_lot::RwLock;

use crate::{
    common::types::SharedRw, configs::Config, monitoring::StatusReporter,
    tracker::SessionRegistry,
};

/// Top-level application state shared by the HTTP routes and the bot tasks.
pub struct AppState {
    pub config: Config,
    pub registry: SharedRw<SessionRegistry>,
    pub status: StatusReporter,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(RwLock::new(SessionRegistry::new()));
        Self {
            config,
            status: StatusReporter::new(registry.clone()),
            registry,
        }
    }
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
