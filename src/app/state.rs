//! Application state shared with the transport layer

use std::sync::Arc;

use crate::config::Config;
use crate::game::MatchRegistry;
use crate::matchmaking::MatchmakingService;
use crate::store::{RestClient, RestStorage, Storage};

/// Shared application state
///
/// The coordinator is constructed exactly once here and handed to
/// whoever needs it; nothing in the crate reaches for a global instance.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn Storage>,
    pub matchmaking: Arc<MatchmakingService>,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let storage: Arc<dyn Storage> = Arc::new(RestStorage::new(RestClient::new(&config)));
        Self::with_storage(config, storage)
    }

    /// Wire the state over any storage backend (tests use the in-memory one)
    pub fn with_storage(config: Arc<Config>, storage: Arc<dyn Storage>) -> Self {
        let match_registry = Arc::new(MatchRegistry::new());
        let matchmaking = Arc::new(MatchmakingService::new(
            match_registry.clone(),
            storage.clone(),
        ));

        Self {
            config,
            storage,
            matchmaking,
            match_registry,
        }
    }
}
