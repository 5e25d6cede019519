use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::{
    cache::ResponseCache,
    config::AppConfig,
    repository::{build_store, VillaStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn VillaStore>,
    pub public_listings_cache: ResponseCache,
}

impl AppState {
    pub async fn build(config: AppConfig) -> Self {
        let store = build_store(&config).await;
        tracing::info!(backend = store.backend_name(), "Villa store ready");
        Self::with_store(config, store)
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn VillaStore>) -> Self {
        let public_listings_cache = ResponseCache::new(
            config.public_listings_cache_ttl_seconds,
            config.public_listings_cache_max_entries,
        );
        let state = Self {
            config: Arc::new(config),
            store,
            public_listings_cache,
        };
        state.spawn_cache_invalidation();
        state
    }

    /// Drops cached catalog responses whenever the store changes, including
    /// changes made by other instances sharing the database.
    fn spawn_cache_invalidation(&self) {
        let mut events = self.store.subscribe();
        let cache = self.public_listings_cache.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        tracing::debug!(
                            table = event.table.as_str(),
                            action = ?event.action,
                            id = %event.id,
                            "Store changed, clearing public cache"
                        );
                        cache.clear().await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Store event feed lagged, clearing public cache");
                        cache.clear().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }
}
