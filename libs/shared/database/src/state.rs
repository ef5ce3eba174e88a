use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, StoreBackend};

use crate::memory::InMemoryStore;
use crate::postgrest::SupabaseStore;
use crate::store::DynDocumentStore;

/// Router state shared by every cell.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: DynDocumentStore,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: DynDocumentStore) -> Self {
        Self { config, store }
    }

    pub fn from_config(config: AppConfig) -> Self {
        let store: DynDocumentStore = match config.store_backend {
            StoreBackend::Supabase => {
                info!("Using Supabase document store at {}", config.supabase_url);
                Arc::new(SupabaseStore::new(&config))
            }
            StoreBackend::Memory => {
                info!("Using in-memory document store");
                Arc::new(InMemoryStore::new())
            }
        };

        Self::new(Arc::new(config), store)
    }
}
