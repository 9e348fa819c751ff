use std::sync::Arc;

use shared::config::server::Config;
use tokio_util::sync::CancellationToken;

use crate::services::{
    notification_store::SharedNotificationStore,
    stream_registry::{SharedStreamRegistry, StreamRegistry},
};

/// Shared across every route.
#[derive(Clone)]
pub struct AppState {
    pub(crate) store: SharedNotificationStore,
    pub(crate) registry: SharedStreamRegistry,
    pub(crate) config: Arc<Config>,
}

impl AppState {
    /// Builds state whose stream registry is cancelled together with `shutdown`.
    pub fn new(store: SharedNotificationStore, config: Arc<Config>, shutdown: &CancellationToken) -> Self {
        Self {
            store,
            registry: Arc::new(StreamRegistry::new(shutdown.child_token())),
            config,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("registry", &self.registry)
            .field("profile", &self.config.profile)
            .finish_non_exhaustive()
    }
}
