//! Search result and confidence-breakdown types (spec.md §3, §4.2, §4.8).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Exact,
    Fuzzy,
    Hybrid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Found,
    Partial,
    NotFound,
}

/// The tier a match was resolved at, carried through for display and for
/// the unified engine's relevance reranking (spec.md §4.8).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    ExactPartNumber,
    FuzzyPartNumber,
    DescriptionMatch,
    ManufacturerMatch,
    PartialMatch,
    NoMatch,
}

/// Structured explanation of a match's score (spec.md glossary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub part_number_score: f64,
    pub part_number_method: String,
    pub description_score: f64,
    pub description_method: String,
    pub manufacturer_score: f64,
    pub manufacturer_method: String,
    pub length_penalty: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyMatch {
    pub part_number: String,
    pub company_name: String,
    pub item_description: String,
    pub quantity: i64,
    pub unit_of_measure: String,
    pub unit_price: f64,
    pub confidence: f64,
    pub match_status: MatchStatus,
    pub match_type: MatchType,
    pub confidence_breakdown: ConfidenceBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PriceSummary {
    pub min: f64,
    pub max: f64,
    pub total_quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub total_matches: i64,
    pub companies: Vec<CompanyMatch>,
    pub price_summary: PriceSummary,
    pub match_type: Option<MatchType>,
    pub search_engine: String,
    pub latency_ms: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl SearchResult {
    pub fn empty(search_engine: &str, page: u32, page_size: u32) -> Self {
        Self {
            total_matches: 0,
            companies: Vec::new(),
            price_summary: PriceSummary::default(),
            match_type: None,
            search_engine: search_engine.to_string(),
            latency_ms: 0,
            page,
            page_size,
            total_pages: 0,
            message: None,
            error: None,
        }
    }

    pub fn failed(search_engine: &str, page: u32, page_size: u32, error: impl Into<String>) -> Self {
        let mut result = Self::empty(search_engine, page, page_size);
        result.error = Some(error.into());
        result
    }
}
