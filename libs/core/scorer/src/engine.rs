//! Fallback-chain orchestration, bulk chunking, match-key dedup and
//! relevance reranking (component H).
//!
//! Grounded on `unified_search_engine.py`'s `search_single_part` /
//! `search_bulk_parts` (primary-then-fallback chain, "zero matches counts as
//! a miss" rule) and its `_comprehensive_search_postgresql` /
//! `_get_match_key` / `_calculate_relevance_score` (dedup key, relevance
//! sort). The dedup/rank helpers are exposed publicly so a backend that
//! internally runs several search strategies (the relational fuzzy backend,
//! G2) can merge its own strategy outputs the same way before returning.

use crate::backend::SearchBackend;
use catalog_core_normalizer::{normalize, similarity};
use catalog_domain_models::{CompanyMatch, SearchMode, SearchResult};
use std::collections::HashMap;
use std::collections::HashSet;
use std::time::Duration;

/// Bulk requests at or under this size are issued as one chunk (spec.md
/// §4.8: "If |parts| <= 10^4, one direct bulk call").
const BULK_DIRECT_THRESHOLD: usize = 10_000;
/// Above the direct threshold, requests are chunked into groups this size.
const BULK_CHUNKED_SIZE: usize = 1000;
const DEFAULT_BULK_CONCURRENCY: usize = 10;
const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(25);
const MIN_QUERY_LEN: usize = 2;
/// `show_all` still bounds a per-part result set rather than returning an
/// unbounded list (spec.md §4.7's 10^7 per-part cap).
pub const MAX_SHOW_ALL_MATCHES: usize = 10_000_000;

/// Slices `ranked` by `page`/`page_size`, or returns everything up to
/// [`MAX_SHOW_ALL_MATCHES`] when `show_all` is set, bypassing pagination
/// entirely (spec.md §4.8, §8's "`show_all = true` returns all
/// `total_matches`"). Shared by every [`SearchBackend`] so G1 and G2 paginate
/// identically.
pub fn paginate(
    ranked: Vec<CompanyMatch>,
    page: u32,
    page_size: u32,
    show_all: bool,
) -> (Vec<CompanyMatch>, i64, u32) {
    let total_matches = ranked.len() as i64;

    let page_slice = if show_all {
        ranked.into_iter().take(MAX_SHOW_ALL_MATCHES).collect()
    } else if page_size == 0 {
        ranked
    } else {
        let start = (page.saturating_sub(1) as usize) * page_size as usize;
        ranked.into_iter().skip(start).take(page_size as usize).collect()
    };

    let total_pages = if show_all || page_size == 0 {
        1
    } else {
        (((total_matches as u32) + page_size - 1) / page_size).max(1)
    };

    (page_slice, total_matches, total_pages)
}

/// Orchestrates one or more [`SearchBackend`]s in priority order, falling
/// back to the next backend when one errors, times out, or returns zero
/// matches. Backends are tried in the order they were given to [`Self::new`]
/// (the caller registers the external index client, G1, ahead of the
/// relational fuzzy backend, G2, so G1 is preferred when available).
pub struct UnifiedSearchEngine {
    backends: Vec<Box<dyn SearchBackend>>,
    bulk_concurrency: usize,
    backend_timeout: Duration,
}

impl UnifiedSearchEngine {
    pub fn new(backends: Vec<Box<dyn SearchBackend>>) -> Self {
        Self {
            backends,
            bulk_concurrency: DEFAULT_BULK_CONCURRENCY,
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    pub fn with_bulk_concurrency(mut self, concurrency: usize) -> Self {
        self.bulk_concurrency = concurrency.max(1);
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    /// Searches a single part number across the fallback chain. `error` is
    /// only set when every backend in the chain failed or timed out; a
    /// backend that genuinely answered with zero matches is not a failure
    /// (spec.md S6 distinguishes the two).
    pub async fn search_single_part(
        &self,
        part_number: &str,
        mode: SearchMode,
        page: u32,
        page_size: u32,
        show_all: bool,
    ) -> SearchResult {
        let trimmed = part_number.trim();
        if trimmed.chars().count() < MIN_QUERY_LEN {
            let mut result = SearchResult::empty("none", page, page_size);
            result.message = Some("Enter at least 2 characters to search".to_string());
            return result;
        }

        let mut backend_failed = false;

        for backend in &self.backends {
            match tokio::time::timeout(
                self.backend_timeout,
                backend.search(trimmed, mode, page, page_size, show_all),
            )
            .await
            {
                Ok(Ok(mut result)) if result.total_matches > 0 => {
                    result.search_engine = backend.name().to_string();
                    return result;
                }
                Ok(Ok(_)) => {
                    tracing::debug!(backend = backend.name(), "zero matches, trying next backend");
                }
                Ok(Err(err)) => {
                    backend_failed = true;
                    tracing::warn!(backend = backend.name(), error = %err, "backend failed, trying next");
                }
                Err(_) => {
                    backend_failed = true;
                    tracing::warn!(backend = backend.name(), "backend timed out, trying next");
                }
            }
        }

        if backend_failed {
            return SearchResult::failed(
                "none",
                page,
                page_size,
                format!("every backend failed or timed out while searching '{trimmed}'"),
            );
        }

        let mut result = SearchResult::empty("none", page, page_size);
        result.message = Some(format!("No matches found for part number '{trimmed}'"));
        result
    }

    /// Searches many part numbers. At or under [`BULK_DIRECT_THRESHOLD`],
    /// the whole list is run through a bounded worker pool as one chunk;
    /// above it, the engine chunks into groups of [`BULK_CHUNKED_SIZE`]
    /// (spec.md §4.8). Each chunk is dispatched through a backend's own
    /// [`SearchBackend::search_bulk`] — one round-trip per chunk per
    /// backend, not one per part — with parts the first backend missed
    /// retried against the next, mirroring `search_single_part`'s
    /// per-backend fallback at chunk granularity.
    pub async fn search_bulk_parts(
        &self,
        part_numbers: &[String],
        mode: SearchMode,
        page: u32,
        page_size: u32,
        show_all: bool,
    ) -> HashMap<String, SearchResult> {
        use futures::stream::{self, StreamExt};

        let chunk_size = if part_numbers.len() <= BULK_DIRECT_THRESHOLD {
            part_numbers.len().max(1)
        } else {
            BULK_CHUNKED_SIZE
        };
        let chunks: Vec<Vec<String>> = part_numbers.chunks(chunk_size).map(|c| c.to_vec()).collect();

        let chunk_results: Vec<Vec<(String, SearchResult)>> = stream::iter(chunks)
            .map(|chunk| self.search_bulk_chunk(chunk, mode, page, page_size, show_all))
            .buffer_unordered(self.bulk_concurrency)
            .collect()
            .await;

        let mut results = HashMap::with_capacity(part_numbers.len());
        for chunk in chunk_results {
            results.extend(chunk);
        }
        results
    }

    /// Runs one bulk chunk across the fallback chain (spec.md §4.7 G1/G2).
    /// A chunk that exhausts every backend without a real answer for some
    /// parts still surfaces results for the parts that DID resolve; only
    /// the unresolved parts carry `error` (S6), and only when a backend
    /// genuinely failed or timed out rather than just returning zero
    /// matches for them.
    async fn search_bulk_chunk(
        &self,
        chunk: Vec<String>,
        mode: SearchMode,
        page: u32,
        page_size: u32,
        show_all: bool,
    ) -> Vec<(String, SearchResult)> {
        let mut remaining = chunk;
        let mut resolved: HashMap<String, SearchResult> = HashMap::with_capacity(remaining.len());
        let mut backend_failed = false;

        for backend in &self.backends {
            if remaining.is_empty() {
                break;
            }

            match tokio::time::timeout(
                self.backend_timeout,
                backend.search_bulk(&remaining, mode, page, page_size, show_all),
            )
            .await
            {
                Ok(Ok(mut by_part)) => {
                    remaining.retain(|part| match by_part.remove(part) {
                        Some(mut result) if result.total_matches > 0 => {
                            result.search_engine = backend.name().to_string();
                            resolved.insert(part.clone(), result);
                            false
                        }
                        _ => true,
                    });
                }
                Ok(Err(err)) => {
                    backend_failed = true;
                    tracing::warn!(backend = backend.name(), error = %err, "bulk backend failed, trying next");
                }
                Err(_) => {
                    backend_failed = true;
                    tracing::warn!(backend = backend.name(), "bulk backend timed out, trying next");
                }
            }
        }

        for part in remaining {
            let result = if backend_failed {
                SearchResult::failed(
                    "none",
                    page,
                    page_size,
                    format!("every backend failed or timed out while searching '{part}'"),
                )
            } else {
                let mut result = SearchResult::empty("none", page, page_size);
                result.message = Some(format!("No matches found for part number '{part}'"));
                result
            };
            resolved.insert(part, result);
        }

        resolved.into_iter().collect()
    }
}

/// Dedup key matching the original pipeline's `_get_match_key`: a match is
/// a duplicate if it repeats the same part number, company and unit price.
fn match_key(m: &CompanyMatch) -> (String, String, u64) {
    (
        m.part_number.to_lowercase(),
        m.company_name.to_lowercase(),
        m.unit_price.to_bits(),
    )
}

/// Merges matches gathered from multiple internal search strategies,
/// dropping later duplicates (first strategy to find a match wins), then
/// sorts by descending relevance to `search_part` (ties broken by ascending
/// unit price, matching every backend-internal `ORDER BY`).
pub fn dedup_and_rank(matches: Vec<CompanyMatch>, search_part: &str) -> Vec<CompanyMatch> {
    let mut seen = HashSet::new();
    let mut deduped: Vec<CompanyMatch> = matches
        .into_iter()
        .filter(|m| seen.insert(match_key(m)))
        .collect();

    deduped.sort_by(|a, b| {
        let score_a = relevance_score(search_part, &a.part_number, &a.item_description);
        let score_b = relevance_score(search_part, &b.part_number, &b.item_description);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.unit_price.partial_cmp(&b.unit_price).unwrap_or(std::cmp::Ordering::Equal))
    });

    deduped
}

/// Port of `_calculate_relevance_score`: exact > normalized-exact >
/// alphanumeric-exact, else the better of part-number similarity and
/// description similarity (description capped lower since it is a weaker
/// signal).
pub fn relevance_score(search_part: &str, db_part: &str, db_description: &str) -> f64 {
    if search_part.eq_ignore_ascii_case(db_part) {
        return 100.0;
    }
    if normalize(search_part, 2).to_lowercase() == normalize(db_part, 2).to_lowercase() {
        return 95.0;
    }
    if normalize(search_part, 3).to_lowercase() == normalize(db_part, 3).to_lowercase() {
        return 90.0;
    }

    let part_similarity = similarity(&search_part.to_lowercase(), &db_part.to_lowercase());
    let desc_similarity = similarity(&search_part.to_lowercase(), &db_description.to_lowercase());
    (part_similarity * 100.0).max(desc_similarity * 80.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_domain_models::{ConfidenceBreakdown, MatchStatus, MatchType};

    fn sample(part: &str, company: &str, price: f64) -> CompanyMatch {
        CompanyMatch {
            part_number: part.to_string(),
            company_name: company.to_string(),
            item_description: String::new(),
            quantity: 1,
            unit_of_measure: "PCS".to_string(),
            unit_price: price,
            confidence: 0.0,
            match_status: MatchStatus::Found,
            match_type: MatchType::ExactPartNumber,
            confidence_breakdown: ConfidenceBreakdown {
                part_number_score: 0.0,
                part_number_method: "test".to_string(),
                description_score: 0.0,
                description_method: "test".to_string(),
                manufacturer_score: 0.0,
                manufacturer_method: "test".to_string(),
                length_penalty: 0.0,
            },
        }
    }

    #[test]
    fn dedup_drops_repeats_of_the_same_key() {
        let matches = vec![
            sample("ABC-123", "Acme", 10.0),
            sample("ABC-123", "Acme", 10.0),
            sample("ABC-123", "Other Co", 10.0),
        ];
        let deduped = dedup_and_rank(matches, "ABC-123");
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn rerank_puts_exact_match_first() {
        let matches = vec![sample("XYZ-999", "Far Co", 5.0), sample("ABC-123", "Acme", 50.0)];
        let ranked = dedup_and_rank(matches, "ABC-123");
        assert_eq!(ranked[0].part_number, "ABC-123");
    }

    #[test]
    fn relevance_score_is_bounded() {
        let score = relevance_score("ABC-123", "XYZ-999", "some widget");
        assert!((0.0..=100.0).contains(&score));
    }
}
