//! The trait the unified engine dispatches to (component G's contract).
//!
//! Implemented once per backend: the external index client (G1, in
//! `catalog-infra-search-index`) and the relational fuzzy repository (G2, in
//! `catalog-infra-db`). Kept here rather than in either infra crate so
//! neither infra crate depends on the other and the engine can hold a
//! `Vec<Box<dyn SearchBackend>>` without a dependency cycle.

use catalog_domain_models::{SearchMode, SearchResult};
use futures::future::BoxFuture;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("[H1_BACKEND_UNAVAILABLE] {0}")]
    Unavailable(String),
    #[error("[H2_BACKEND_FAILED] {0}")]
    Failed(String),
}

/// A single search backend in the engine's fallback chain. `search` takes
/// `&self` and returns a boxed future rather than using `async fn` in the
/// trait so the engine can hold backends as `Box<dyn SearchBackend>`.
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn search<'a>(
        &'a self,
        part_number: &'a str,
        mode: SearchMode,
        page: u32,
        page_size: u32,
        show_all: bool,
    ) -> BoxFuture<'a, Result<SearchResult, BackendError>>;

    /// Batched form of [`Self::search`] (spec.md §4.7): a real backend issues
    /// one round-trip (or a small, size-bounded number of them) for the
    /// whole `part_numbers` list rather than one round-trip per part. A part
    /// absent from the returned map, or present with zero matches, is
    /// treated by the engine as a miss for this backend and retried against
    /// the next one in the chain.
    fn search_bulk<'a>(
        &'a self,
        part_numbers: &'a [String],
        mode: SearchMode,
        page: u32,
        page_size: u32,
        show_all: bool,
    ) -> BoxFuture<'a, Result<HashMap<String, SearchResult>, BackendError>>;
}
