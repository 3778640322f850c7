//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::shopify::{AdminApiError, RequestGate, RestClient};
use crate::sync::OrderSequencer;

/// Application state shared across all request handlers.
///
/// Cheap to clone; the sequencer (and through it the one request gate)
/// is shared by every trigger invocation.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
    sequencer: Arc<OrderSequencer>,
}

impl AppState {
    /// Build the state: one gate, one client, one driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed from the
    /// configuration.
    pub fn new(config: ServerConfig) -> Result<Self, AdminApiError> {
        let gate = RequestGate::new(config.rate_limit.clone());
        let client = RestClient::new(&config.shopify, gate)?;
        let sequencer = OrderSequencer::new(client, config.sync.clone());

        Ok(Self {
            config: Arc::new(config),
            sequencer: Arc::new(sequencer),
        })
    }

    /// Server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The synchronization driver.
    #[must_use]
    pub fn sequencer(&self) -> &OrderSequencer {
        &self.sequencer
    }
}
