//! The external index backend (G1): a `reqwest` client issuing chunked
//! multi-search requests and mapping backend scores onto the shared
//! `CompanyMatch`/confidence contract.

use catalog_core_scorer::{paginate, BackendError, SearchBackend};
use catalog_domain_models::{
    ConfidenceBreakdown, MatchStatus, MatchType, PriceSummary, SearchMode, SearchResult,
};
use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// At most this many parts per multi-search sub-request (spec.md §4.7 G1).
const MAX_PARTS_PER_CHUNK: usize = 50;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Error)]
pub enum IndexClientError {
    #[error("[G1_1_NETWORK_FAULT] {0}")]
    Network(#[from] reqwest::Error),
    #[error("[G1_2_PROVIDER_REJECTION] index endpoint rejected the request: {0}")]
    ProviderRejection(String),
}

pub struct ExternalIndexBackend {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    file_id: i64,
}

impl ExternalIndexBackend {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, file_id: i64) -> Self {
        Self {
            http: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .user_agent("catalog-api-gateway/search-index-client")
                .build()
                .expect("failed to build the search-index HTTP client"),
            endpoint: endpoint.into(),
            api_key,
            file_id,
        }
    }

    /// One `msearch` sub-request per [`MAX_PARTS_PER_CHUNK`]-sized group of
    /// `parts`, returning each part's hits positionally aligned to `parts`
    /// across every chunk (grounded on `elasticsearch_client.py`'s
    /// `bulk_search`, which reads `response['responses'][i]` back against
    /// `part_numbers[i]`). A single-part [`Self::search`] call is just this
    /// with a one-element `parts` slice.
    async fn multi_search(
        &self,
        parts: &[String],
        mode: SearchMode,
    ) -> Result<Vec<Vec<IndexHit>>, IndexClientError> {
        let mut hits_by_part = Vec::with_capacity(parts.len());
        for chunk in parts.chunks(MAX_PARTS_PER_CHUNK) {
            let request = MultiSearchRequest {
                file_id: self.file_id,
                mode,
                queries: chunk
                    .iter()
                    .map(|p| PartQuery {
                        part_number: p.clone(),
                        exact_boost: 10.0,
                        prefix_boost: 5.0,
                        fuzzy_boost: 2.0,
                    })
                    .collect(),
            };

            let mut req = self.http.post(format!("{}/msearch", self.endpoint)).json(&request);
            if let Some(key) = &self.api_key {
                req = req.bearer_auth(key);
            }

            let response = req.send().await?;
            if !response.status().is_success() {
                return Err(IndexClientError::ProviderRejection(response.status().to_string()));
            }
            let mut parsed: MultiSearchResponse = response.json().await?;
            // A provider that drops a query from its response body shouldn't
            // desynchronize the positional alignment for the rest of parts.
            parsed.responses.resize_with(chunk.len(), || PartHits { hits: Vec::new() });
            hits_by_part.extend(parsed.responses.into_iter().map(|r| r.hits));
        }
        Ok(hits_by_part)
    }

    fn to_search_result(hits: Vec<IndexHit>, page: u32, page_size: u32, show_all: bool) -> SearchResult {
        let mut sorted = hits;
        sorted.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.unit_price.partial_cmp(&b.unit_price).unwrap_or(std::cmp::Ordering::Equal))
        });

        let companies: Vec<catalog_domain_models::CompanyMatch> = sorted
            .iter()
            .map(|hit| {
                let confidence = (hit.score / 10.0 * 100.0).clamp(0.0, 100.0);
                let match_type = if hit.score > 8.0 {
                    MatchType::ExactPartNumber
                } else if hit.score > 4.0 {
                    MatchType::FuzzyPartNumber
                } else {
                    MatchType::PartialMatch
                };
                catalog_domain_models::CompanyMatch {
                    part_number: hit.part_number.clone(),
                    company_name: hit.company_name.clone(),
                    item_description: hit.item_description.clone(),
                    quantity: hit.quantity,
                    unit_of_measure: hit.unit_of_measure.clone(),
                    unit_price: hit.unit_price,
                    confidence,
                    match_status: if confidence > 0.0 { MatchStatus::Found } else { MatchStatus::NotFound },
                    match_type,
                    confidence_breakdown: ConfidenceBreakdown {
                        part_number_score: confidence,
                        part_number_method: "external_index_score".to_string(),
                        description_score: 0.0,
                        description_method: "not_calculated".to_string(),
                        manufacturer_score: 0.0,
                        manufacturer_method: "not_calculated".to_string(),
                        length_penalty: 0.0,
                    },
                }
            })
            .collect();

        let (page_slice, total_matches, total_pages) = paginate(companies, page, page_size, show_all);

        let prices: Vec<f64> = page_slice.iter().map(|c| c.unit_price).filter(|p| *p > 0.0).collect();
        let total_quantity = page_slice.iter().map(|c| c.quantity).sum();
        let price_summary = PriceSummary {
            min: if prices.is_empty() { 0.0 } else { prices.iter().cloned().fold(f64::INFINITY, f64::min) },
            max: prices.iter().cloned().fold(0.0, f64::max),
            total_quantity,
        };

        SearchResult {
            total_matches,
            companies: page_slice,
            price_summary,
            match_type: None,
            search_engine: "external_index".to_string(),
            latency_ms: 0,
            page,
            page_size,
            total_pages,
            message: Some(format!("Found {total_matches} companies")),
            error: None,
        }
    }
}

impl SearchBackend for ExternalIndexBackend {
    fn name(&self) -> &'static str {
        "external_index"
    }

    fn search<'a>(
        &'a self,
        part_number: &'a str,
        mode: SearchMode,
        page: u32,
        page_size: u32,
        show_all: bool,
    ) -> BoxFuture<'a, Result<SearchResult, BackendError>> {
        Box::pin(async move {
            let parts = vec![part_number.to_string()];
            let mut hits = self
                .multi_search(&parts, mode)
                .await
                .map_err(|e| BackendError::Failed(e.to_string()))?;
            let hit_list = hits.pop().unwrap_or_default();
            Ok(Self::to_search_result(hit_list, page, page_size, show_all))
        })
    }

    fn search_bulk<'a>(
        &'a self,
        part_numbers: &'a [String],
        mode: SearchMode,
        page: u32,
        page_size: u32,
        show_all: bool,
    ) -> BoxFuture<'a, Result<HashMap<String, SearchResult>, BackendError>> {
        Box::pin(async move {
            let hits_by_part = self
                .multi_search(part_numbers, mode)
                .await
                .map_err(|e| BackendError::Failed(e.to_string()))?;
            let mut out = HashMap::with_capacity(part_numbers.len());
            for (part, hits) in part_numbers.iter().zip(hits_by_part.into_iter()) {
                out.insert(part.clone(), Self::to_search_result(hits, page, page_size, show_all));
            }
            Ok(out)
        })
    }
}

#[derive(Debug, Serialize)]
struct PartQuery {
    part_number: String,
    exact_boost: f64,
    prefix_boost: f64,
    fuzzy_boost: f64,
}

#[derive(Debug, Serialize)]
struct MultiSearchRequest {
    file_id: i64,
    mode: SearchMode,
    queries: Vec<PartQuery>,
}

#[derive(Debug, Clone, Deserialize)]
struct IndexHit {
    part_number: String,
    company_name: String,
    item_description: String,
    quantity: i64,
    unit_of_measure: String,
    unit_price: f64,
    score: f64,
}

/// One query's worth of hits, positioned within [`MultiSearchResponse`] at
/// the same index as its request in `MultiSearchRequest::queries`.
#[derive(Debug, Deserialize)]
struct PartHits {
    hits: Vec<IndexHit>,
}

#[derive(Debug, Deserialize)]
struct MultiSearchResponse {
    responses: Vec<PartHits>,
}
