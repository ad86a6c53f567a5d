//! Content-addressed result cache (component J).
//!
//! Grounded on the pack's attested TTL-cache crate, `moka` (see
//! `DESIGN.md`): three fixed-TTL caches (column-mapping 2h, search-result
//! 30m, warm-up 5m) rather than one cache with per-entry dynamic TTL, since
//! spec.md §3/§4.10 name exactly three entry kinds with exactly three fixed
//! TTLs. A cache miss is never an error; callers always have a live path
//! that recomputes on miss.

use catalog_domain_models::SearchResult;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

const COLUMN_MAPPING_TTL: Duration = Duration::from_secs(2 * 60 * 60);
const RESULT_TTL: Duration = Duration::from_secs(30 * 60);
const WARMUP_TTL: Duration = Duration::from_secs(5 * 60);

/// Values above this size are replaced by a lossy summary before caching
/// (spec.md §3's "Cache entry" note).
pub const MAX_FULL_VALUE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    SingleSearch,
    BulkSearch,
}

/// Mirrors a `SearchResult` when it fits under [`MAX_FULL_VALUE_BYTES`], or
/// a lossy summary (totals and per-part match counts only) when it doesn't.
/// `compressed` signals which form a reader received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResult {
    pub full: Option<SearchResult>,
    pub summary: Option<ResultSummary>,
    pub compressed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub total_matches: i64,
    pub per_part_match_counts: Vec<(String, i64)>,
}

impl CachedResult {
    pub fn from_search_result(result: &SearchResult) -> Self {
        match serde_json::to_vec(result) {
            Ok(bytes) if bytes.len() <= MAX_FULL_VALUE_BYTES => Self {
                full: Some(result.clone()),
                summary: None,
                compressed: false,
            },
            _ => Self {
                full: None,
                summary: Some(ResultSummary {
                    total_matches: result.total_matches,
                    per_part_match_counts: vec![(result.search_engine.clone(), result.total_matches)],
                }),
                compressed: true,
            },
        }
    }
}

/// Builds the stable key spec.md §3 describes: `(operation, file_id?,
/// hash(sorted_parts), search_mode, page_size, show_all)`, collapsed to one
/// opaque string so it can key a single flat cache.
pub fn cache_key(
    operation: CacheOperation,
    file_id: Option<i64>,
    part_numbers: &[String],
    search_mode: &str,
    page_size: u32,
    show_all: bool,
) -> String {
    let mut sorted: Vec<String> = part_numbers.iter().map(|p| p.to_lowercase()).collect();
    sorted.sort();

    let mut hasher = DefaultHasher::new();
    sorted.hash(&mut hasher);
    let parts_hash = hasher.finish();

    format!(
        "{operation:?}:{file_id:?}:{parts_hash:x}:{search_mode}:{page_size}:{show_all}"
    )
}

/// Holds the three fixed-TTL caches named in spec.md §4.10.
pub struct ResultCache {
    results: Cache<String, CachedResult>,
    column_mappings: Cache<String, String>,
    warmup: Cache<String, CachedResult>,
}

impl ResultCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            results: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(RESULT_TTL)
                .build(),
            column_mappings: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(COLUMN_MAPPING_TTL)
                .build(),
            warmup: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(WARMUP_TTL)
                .build(),
        }
    }

    pub async fn get_result(&self, key: &str) -> Option<CachedResult> {
        self.results.get(key).await
    }

    pub async fn put_result(&self, key: String, value: CachedResult) {
        self.results.insert(key, value).await;
    }

    pub async fn get_column_mapping(&self, key: &str) -> Option<String> {
        self.column_mappings.get(key).await
    }

    pub async fn put_column_mapping(&self, key: String, value: String) {
        self.column_mappings.insert(key, value).await;
    }

    pub async fn get_warmup(&self, key: &str) -> Option<CachedResult> {
        self.warmup.get(key).await
    }

    pub async fn put_warmup(&self, key: String, value: CachedResult) {
        self.warmup.insert(key, value).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_order_independent_over_parts() {
        let a = cache_key(
            CacheOperation::BulkSearch,
            Some(1),
            &["B".to_string(), "A".to_string()],
            "hybrid",
            50,
            false,
        );
        let b = cache_key(
            CacheOperation::BulkSearch,
            Some(1),
            &["A".to_string(), "B".to_string()],
            "hybrid",
            50,
            false,
        );
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn put_then_get_within_ttl_returns_the_value() {
        let cache = ResultCache::new(100);
        let key = "test-key".to_string();
        let value = CachedResult {
            full: None,
            summary: Some(ResultSummary {
                total_matches: 3,
                per_part_match_counts: vec![("none".to_string(), 3)],
            }),
            compressed: true,
        };
        cache.put_result(key.clone(), value).await;
        let fetched = cache.get_result(&key).await;
        assert!(fetched.is_some());
    }
}
