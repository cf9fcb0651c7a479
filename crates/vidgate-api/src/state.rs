//! Application state.

use std::sync::Arc;

use vidgate_core::Config;
use vidgate_db::RecordStore;
use vidgate_provider::VideoProvider;

use crate::broadcast::StatusBroadcaster;

/// Shared state behind every handler. The record store and provider are
/// trait objects so tests run against the in-memory store and a stub
/// provider.
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub provider: Arc<dyn VideoProvider>,
    pub broadcaster: StatusBroadcaster,
    pub config: Config,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn VideoProvider>,
        config: Config,
    ) -> Self {
        Self {
            store,
            provider,
            broadcaster: StatusBroadcaster::new(),
            config,
        }
    }
}
