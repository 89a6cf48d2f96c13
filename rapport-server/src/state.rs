//! Application state management

use rapport::Rapport;

use crate::config::ServerConfig;

/// Application state shared across all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// Every Rapport concept over the configured backend
    pub rapport: Rapport,

    /// Server configuration
    pub config: ServerConfig,
}

impl AppState {
    /// Create new application state
    pub fn new(rapport: Rapport, config: ServerConfig) -> Self {
        Self { rapport, config }
    }
}
