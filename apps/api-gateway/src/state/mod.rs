//! Composition root for the gateway's shared state.
//!
//! Kept in the teacher's shape (one `Clone`-able `AppState` struct wrapping
//! `Arc`s, a `SystemMode` gate consulted by `health_guard`) but stripped of
//! every mining/identity-domain stratum (AI cortex, swarm telemetry,
//! mission control, finding vault, GraphQL oracle) that has no counterpart
//! in this service.

pub mod upload_sessions;

use crate::config::Settings;
use crate::services::event_bus::EventBus;
use catalog_core_scorer::{SearchBackend, UnifiedSearchEngine};
use catalog_infra_cache::ResultCache;
use catalog_infra_db::{DatabaseClient, DbError};
use catalog_infra_search_index::ExternalIndexBackend;
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};
use upload_sessions::UploadSessionRegistry;

/// System health gate consulted by `health_guard` (teacher's `SystemMode`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemMode {
    Operational,
    Maintenance(String),
}

#[derive(Clone)]
pub struct AppState {
    pub database_client: DatabaseClient,
    pub settings: Arc<Settings>,
    pub event_bus: Arc<EventBus>,
    pub upload_sessions: Arc<UploadSessionRegistry>,
    pub cache: Arc<ResultCache>,
    current_system_mode: Arc<RwLock<SystemMode>>,
}

impl AppState {
    pub fn new(database_client: DatabaseClient, settings: Settings) -> Self {
        let settings = Arc::new(settings);
        Self {
            database_client,
            cache: Arc::new(ResultCache::new(settings.cache_max_capacity)),
            settings,
            event_bus: Arc::new(EventBus::new()),
            upload_sessions: Arc::new(UploadSessionRegistry::new()),
            current_system_mode: Arc::new(RwLock::new(SystemMode::Operational)),
        }
    }

    /// Builds the fallback chain for one dataset: G1 (external index) ahead
    /// of G2 (relational fuzzy) when a search-index endpoint is configured,
    /// G2 alone otherwise (spec.md §4.8's priority-order construction).
    pub fn build_search_engine(&self, file_id: i64, table_name: &str) -> Result<UnifiedSearchEngine, DbError> {
        let mut backends: Vec<Box<dyn SearchBackend>> = Vec::new();

        if let Some(endpoint) = &self.settings.search_index_endpoint {
            backends.push(Box::new(ExternalIndexBackend::new(
                endpoint.clone(),
                self.settings.search_index_api_key.clone(),
                file_id,
            )));
        }

        let connection = self.database_client.get_connection()?;
        backends.push(Box::new(catalog_infra_db::repositories::SearchRepository::new(
            connection,
            table_name,
        )));

        Ok(UnifiedSearchEngine::new(backends))
    }

    pub fn set_mode(&self, target: SystemMode) {
        match self.current_system_mode.write() {
            Ok(mut guard) => {
                info!(mode = ?target, "system mode transition");
                *guard = target;
            }
            Err(poisoned) => error!(error = %poisoned, "system mode lock poisoned"),
        }
    }

    pub fn is_operational(&self) -> Result<(), String> {
        let guard = self.current_system_mode.read().map_err(|e| format!("lock poisoned: {e}"))?;
        match &*guard {
            SystemMode::Operational => Ok(()),
            SystemMode::Maintenance(reason) => {
                warn!(reason, "request rejected, maintenance mode active");
                Err(reason.clone())
            }
        }
    }
}
