//! Relational fuzzy search backend (component G2).
//!
//! Grounded on `unified_search_engine.py`'s `_comprehensive_search_postgresql`:
//! several strategies run in priority order and their results are unioned,
//! deduplicated and reranked. The Python runs trigram similarity and
//! normalized equality as SQL expressions via Postgres' `pg_trgm`/string
//! functions; libSQL has neither, so this backend instead pulls a bounded
//! candidate set per strategy with cheap `LIKE` predicates and applies the
//! precise normalized-equality/trigram/similarity comparisons in Rust using
//! [`catalog_core_normalizer`], scoring survivors with
//! [`catalog_core_scorer::calculate_confidence`]. See DESIGN.md.

use catalog_core_normalizer::{normalize, separator_tokenize, trigram_similarity};
use catalog_core_scorer::{calculate_confidence, dedup_and_rank, paginate, BackendError, SearchBackend};
use catalog_domain_models::{CompanyMatch, PriceSummary, SearchMode, SearchResult};
use futures::future::BoxFuture;
use libsql::{params, Connection, Row, Value};
use std::collections::HashMap;
use tracing::instrument;

/// Per-strategy SQL fetch bound; final relevance ranking and pagination
/// happen in memory over the union, so this only needs to be generous
/// enough that a real match is unlikely to be excluded.
const CANDIDATE_FETCH_LIMIT: i64 = 500;
/// Trigram similarity floor for the part-number fuzzy strategy.
const PART_TRIGRAM_THRESHOLD: f64 = 0.3;
/// Similarity/substring floor for the description fallback strategy
/// (spec.md §4.7 G2 iv).
const DESCRIPTION_THRESHOLD: f64 = 0.3;
/// Row cap for the bulk union query (spec.md §4.7 G2's "bounded to 10^4
/// rows total, then groups in memory").
const BULK_UNION_ROW_CAP: i64 = 10_000;

pub struct SearchRepository {
    connection: Connection,
    table_name: String,
}

#[derive(Clone)]
struct Candidate {
    row_id: i64,
    part_number: String,
    item_description: String,
    company_name: String,
    quantity: i64,
    unit_of_measure: String,
    unit_price: f64,
}

impl SearchRepository {
    pub fn new(connection: Connection, table_name: impl Into<String>) -> Self {
        Self { connection, table_name: table_name.into() }
    }

    fn candidate_from_row(row: &Row) -> Result<Candidate, libsql::Error> {
        Ok(Candidate {
            row_id: row.get(0)?,
            part_number: row.get::<Option<String>>(1)?.unwrap_or_default(),
            item_description: row.get::<Option<String>>(2)?.unwrap_or_default(),
            company_name: row.get::<Option<String>>(3)?.unwrap_or_default(),
            quantity: row.get(4)?,
            unit_of_measure: row.get::<Option<String>>(5)?.unwrap_or_default(),
            unit_price: row.get(6)?,
        })
    }

    const SELECT_COLUMNS: &'static str =
        "id, part_number, item_description, primary_buyer, quantity, unit_of_measure, unit_price";

    async fn exact_candidates(&self, search_part: &str) -> Result<Vec<Candidate>, BackendError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE LOWER(part_number) = LOWER(?1) LIMIT ?2",
            Self::SELECT_COLUMNS,
            self.table_name
        );
        self.run_candidate_query(&sql, params![search_part, CANDIDATE_FETCH_LIMIT]).await
    }

    /// Cheap `LIKE`-bounded candidate pull for the normalized-equality and
    /// trigram strategies (ii, iii): broadened on either side so the exact
    /// separator-stripped/alphanumeric-only comparison can still be done
    /// precisely afterwards in Rust.
    async fn part_number_candidates(&self, search_part: &str) -> Result<Vec<Candidate>, BackendError> {
        let loose = format!("%{}%", search_part.trim());
        let sql = format!(
            "SELECT {} FROM {} WHERE LOWER(part_number) LIKE LOWER(?1) LIMIT ?2",
            Self::SELECT_COLUMNS,
            self.table_name
        );
        self.run_candidate_query(&sql, params![loose, CANDIDATE_FETCH_LIMIT]).await
    }

    async fn description_candidates(&self, tokens: &[String]) -> Result<Vec<Candidate>, BackendError> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for token in tokens.iter().take(3) {
            let loose = format!("%{}%", token);
            let sql = format!(
                "SELECT {} FROM {} WHERE LOWER(item_description) LIKE LOWER(?1) LIMIT ?2",
                Self::SELECT_COLUMNS,
                self.table_name
            );
            out.extend(self.run_candidate_query(&sql, params![loose, CANDIDATE_FETCH_LIMIT]).await?);
        }
        Ok(out)
    }

    async fn run_candidate_query(
        &self,
        sql: &str,
        query_params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Candidate>, BackendError> {
        let mut rows = self
            .connection
            .query(sql, query_params)
            .await
            .map_err(|e| BackendError::Failed(e.to_string()))?;
        let mut out = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => match Self::candidate_from_row(&row) {
                    Ok(c) => out.push(c),
                    Err(e) => return Err(BackendError::Failed(e.to_string())),
                },
                Ok(None) => break,
                Err(e) => return Err(BackendError::Failed(e.to_string())),
            }
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    async fn run_search(
        &self,
        search_part: &str,
        mode: SearchMode,
        page: u32,
        page_size: u32,
        show_all: bool,
    ) -> Result<SearchResult, BackendError> {
        let mut by_row_id = std::collections::HashMap::new();

        for candidate in self.exact_candidates(search_part).await? {
            by_row_id.entry(candidate.row_id).or_insert(candidate);
        }

        if !matches!(mode, SearchMode::Exact) {
            for candidate in self.part_number_candidates(search_part).await? {
                let qualifies = normalize(&candidate.part_number, 2).eq_ignore_ascii_case(&normalize(search_part, 2))
                    || normalize(&candidate.part_number, 3).eq_ignore_ascii_case(&normalize(search_part, 3))
                    || trigram_similarity(&candidate.part_number.to_lowercase(), &search_part.to_lowercase())
                        >= PART_TRIGRAM_THRESHOLD;
                if qualifies {
                    by_row_id.entry(candidate.row_id).or_insert(candidate);
                }
            }

            let tokens = separator_tokenize(search_part);
            for candidate in self.description_candidates(&tokens).await? {
                let lower_desc = candidate.item_description.to_lowercase();
                let lower_part = search_part.to_lowercase();
                let qualifies = lower_desc.contains(&lower_part)
                    || trigram_similarity(&lower_desc, &lower_part) >= DESCRIPTION_THRESHOLD;
                if qualifies {
                    by_row_id.entry(candidate.row_id).or_insert(candidate);
                }
            }
        }

        let companies: Vec<CompanyMatch> = by_row_id
            .into_values()
            .map(|candidate| {
                let scored = calculate_confidence(search_part, "", "", &candidate.part_number, &candidate.item_description, "");
                CompanyMatch {
                    part_number: candidate.part_number,
                    company_name: candidate.company_name,
                    item_description: candidate.item_description,
                    quantity: candidate.quantity,
                    unit_of_measure: candidate.unit_of_measure,
                    unit_price: candidate.unit_price,
                    confidence: scored.confidence,
                    match_status: scored.match_status,
                    match_type: scored.match_type,
                    confidence_breakdown: scored.breakdown,
                }
            })
            .collect();

        let ranked = dedup_and_rank(companies, search_part);
        let (page_slice, total_matches, total_pages) = paginate(ranked, page, page_size, show_all);

        let prices: Vec<f64> = page_slice.iter().map(|c| c.unit_price).filter(|p| *p > 0.0).collect();
        let price_summary = PriceSummary {
            min: if prices.is_empty() { 0.0 } else { prices.iter().cloned().fold(f64::INFINITY, f64::min) },
            max: prices.iter().cloned().fold(0.0, f64::max),
            total_quantity: page_slice.iter().map(|c| c.quantity).sum(),
        };

        Ok(SearchResult {
            total_matches,
            companies: page_slice,
            price_summary,
            match_type: None,
            search_engine: "relational_fuzzy".to_string(),
            latency_ms: 0,
            page,
            page_size,
            total_pages,
            message: Some(format!("Found {total_matches} companies")),
            error: None,
        })
    }

    /// Bulk form of [`Self::run_search`] (spec.md §4.7 G2): one query whose
    /// `exact_matches`/`fuzzy_matches` CTEs cover every requested part
    /// number, bounded to [`BULK_UNION_ROW_CAP`] rows total, then grouped
    /// and scored in memory per requested part. Grounded on
    /// `unified_search_engine.py`'s `_search_with_postgresql_bulk`, whose
    /// `ANY(%s)` array parameters have no libSQL equivalent; this builds the
    /// same dynamic-arity `IN (...)`/`LIKE ... OR ...` placeholder lists by
    /// hand via `libsql::params::Params::Positional`.
    #[instrument(skip(self, part_numbers), fields(parts = part_numbers.len()))]
    async fn run_bulk_search(
        &self,
        part_numbers: &[String],
        mode: SearchMode,
        page: u32,
        page_size: u32,
        show_all: bool,
    ) -> Result<HashMap<String, SearchResult>, BackendError> {
        let lowered: Vec<String> = part_numbers.iter().map(|p| p.to_lowercase()).collect();
        let exact_in_list = lowered.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let mut bind_values: Vec<Value> = lowered.iter().map(|p| Value::Text(p.clone())).collect();

        let sql = if matches!(mode, SearchMode::Exact) {
            bind_values.push(Value::Integer(BULK_UNION_ROW_CAP));
            format!(
                "SELECT {columns} FROM {table} WHERE LOWER(part_number) IN ({exact_in_list}) LIMIT ?",
                columns = Self::SELECT_COLUMNS,
                table = self.table_name,
            )
        } else {
            let fuzzy_or_chain =
                lowered.iter().map(|_| "LOWER(part_number) LIKE ?").collect::<Vec<_>>().join(" OR ");
            for part in &lowered {
                bind_values.push(Value::Text(format!("%{part}%")));
            }
            bind_values.push(Value::Integer(BULK_UNION_ROW_CAP));
            format!(
                "WITH exact_matches AS (\
                    SELECT {columns} FROM {table} WHERE LOWER(part_number) IN ({exact_in_list})\
                ), fuzzy_matches AS (\
                    SELECT {columns} FROM {table} WHERE {fuzzy_or_chain}\
                ) SELECT * FROM exact_matches UNION ALL SELECT * FROM fuzzy_matches LIMIT ?",
                columns = Self::SELECT_COLUMNS,
                table = self.table_name,
            )
        };

        let candidates =
            self.run_candidate_query(&sql, libsql::params::Params::Positional(bind_values)).await?;

        let mut lower_to_requested: HashMap<String, Vec<String>> = HashMap::new();
        for part in part_numbers {
            lower_to_requested.entry(part.to_lowercase()).or_default().push(part.clone());
        }

        let mut per_part_candidates: HashMap<String, HashMap<i64, Candidate>> =
            part_numbers.iter().map(|p| (p.clone(), HashMap::new())).collect();

        for candidate in candidates {
            let cand_lower = candidate.part_number.to_lowercase();
            let mut matched_exact = false;
            if let Some(requested) = lower_to_requested.get(&cand_lower) {
                for req in requested {
                    per_part_candidates
                        .entry(req.clone())
                        .or_default()
                        .entry(candidate.row_id)
                        .or_insert_with(|| candidate.clone());
                }
                matched_exact = true;
            }

            if matched_exact || matches!(mode, SearchMode::Exact) {
                continue;
            }

            for part in part_numbers {
                let qualifies = normalize(&candidate.part_number, 2).eq_ignore_ascii_case(&normalize(part, 2))
                    || normalize(&candidate.part_number, 3).eq_ignore_ascii_case(&normalize(part, 3))
                    || trigram_similarity(&candidate.part_number.to_lowercase(), &part.to_lowercase())
                        >= PART_TRIGRAM_THRESHOLD;
                if qualifies {
                    per_part_candidates
                        .entry(part.clone())
                        .or_default()
                        .entry(candidate.row_id)
                        .or_insert_with(|| candidate.clone());
                }
            }
        }

        let mut out = HashMap::with_capacity(part_numbers.len());
        for part in part_numbers {
            if out.contains_key(part) {
                continue;
            }

            let by_row_id = per_part_candidates.remove(part).unwrap_or_default();
            let companies: Vec<CompanyMatch> = by_row_id
                .into_values()
                .map(|candidate| {
                    let scored = calculate_confidence(
                        part,
                        "",
                        "",
                        &candidate.part_number,
                        &candidate.item_description,
                        "",
                    );
                    CompanyMatch {
                        part_number: candidate.part_number,
                        company_name: candidate.company_name,
                        item_description: candidate.item_description,
                        quantity: candidate.quantity,
                        unit_of_measure: candidate.unit_of_measure,
                        unit_price: candidate.unit_price,
                        confidence: scored.confidence,
                        match_status: scored.match_status,
                        match_type: scored.match_type,
                        confidence_breakdown: scored.breakdown,
                    }
                })
                .collect();

            let ranked = dedup_and_rank(companies, part);
            let (page_slice, total_matches, total_pages) = paginate(ranked, page, page_size, show_all);

            let prices: Vec<f64> = page_slice.iter().map(|c| c.unit_price).filter(|p| *p > 0.0).collect();
            let price_summary = PriceSummary {
                min: if prices.is_empty() { 0.0 } else { prices.iter().cloned().fold(f64::INFINITY, f64::min) },
                max: prices.iter().cloned().fold(0.0, f64::max),
                total_quantity: page_slice.iter().map(|c| c.quantity).sum(),
            };

            out.insert(
                part.clone(),
                SearchResult {
                    total_matches,
                    companies: page_slice,
                    price_summary,
                    match_type: None,
                    search_engine: "relational_fuzzy".to_string(),
                    latency_ms: 0,
                    page,
                    page_size,
                    total_pages,
                    message: Some(format!("Found {total_matches} companies")),
                    error: None,
                },
            );
        }

        Ok(out)
    }
}

impl SearchBackend for SearchRepository {
    fn name(&self) -> &'static str {
        "relational_fuzzy"
    }

    fn search<'a>(
        &'a self,
        part_number: &'a str,
        mode: SearchMode,
        page: u32,
        page_size: u32,
        show_all: bool,
    ) -> BoxFuture<'a, Result<SearchResult, BackendError>> {
        Box::pin(self.run_search(part_number, mode, page, page_size, show_all))
    }

    fn search_bulk<'a>(
        &'a self,
        part_numbers: &'a [String],
        mode: SearchMode,
        page: u32,
        page_size: u32,
        show_all: bool,
    ) -> BoxFuture<'a, Result<HashMap<String, SearchResult>, BackendError>> {
        Box::pin(self.run_bulk_search(part_numbers, mode, page, page_size, show_all))
    }
}
