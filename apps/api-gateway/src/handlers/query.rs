//! Single and bulk part-number search (components G/H), cached through J.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use catalog_domain_models::SearchMode;
use catalog_infra_cache::{cache_key, CacheOperation, CachedResult};
use serde::Deserialize;
use serde_json::{json, Value};

fn default_page() -> u32 {
    1
}
fn default_page_size() -> u32 {
    50
}
fn default_mode() -> SearchMode {
    SearchMode::Hybrid
}

#[derive(Debug, Deserialize)]
pub struct SingleSearchRequest {
    pub file_id: i64,
    pub part_number: String,
    #[serde(default = "default_mode")]
    pub mode: SearchMode,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Bypasses `page`/`page_size` and returns every match, bounded by the
    /// engine's per-part cap (spec.md §4.8, §8).
    #[serde(default)]
    pub show_all: bool,
}

pub async fn search_part(
    State(state): State<AppState>,
    Json(request): Json<SingleSearchRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let table_name = table_name_for(&state, request.file_id).await?;
    let mode_str = mode_label(request.mode);
    let key = cache_key(
        CacheOperation::SingleSearch,
        Some(request.file_id),
        std::slice::from_ref(&request.part_number),
        mode_str,
        request.page_size,
        request.show_all,
    );

    if let Some(cached) = state.cache.get_result(&key).await {
        if let Some(full) = cached.full {
            return Ok(Json(json!({ "result": full, "cached": true })));
        }
    }

    let engine = state.build_search_engine(request.file_id, &table_name).map_err(internal_error)?;
    let result = engine
        .search_single_part(
            &request.part_number,
            request.mode,
            request.page,
            request.page_size,
            request.show_all,
        )
        .await;

    state.cache.put_result(key, CachedResult::from_search_result(&result)).await;
    Ok(Json(json!({ "result": result, "cached": false })))
}

#[derive(Debug, Deserialize)]
pub struct BulkSearchRequest {
    pub file_id: i64,
    pub part_numbers: Vec<String>,
    #[serde(default = "default_mode")]
    pub mode: SearchMode,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub show_all: bool,
}

pub async fn search_part_bulk(
    State(state): State<AppState>,
    Json(request): Json<BulkSearchRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let table_name = table_name_for(&state, request.file_id).await?;
    let mode_str = mode_label(request.mode);
    let key = cache_key(
        CacheOperation::BulkSearch,
        Some(request.file_id),
        &request.part_numbers,
        mode_str,
        request.page_size,
        request.show_all,
    );

    if let Some(cached) = state.cache.get_result(&key).await {
        if let Some(full) = cached.full {
            return Ok(Json(json!({ "result": full, "cached": true })));
        }
    }

    let engine = state.build_search_engine(request.file_id, &table_name).map_err(internal_error)?;
    let results = engine
        .search_bulk_parts(
            &request.part_numbers,
            request.mode,
            request.page,
            request.page_size,
            request.show_all,
        )
        .await;

    Ok(Json(json!({ "results": results, "cached": false })))
}

async fn table_name_for(state: &AppState, file_id: i64) -> Result<String, (StatusCode, Json<Value>)> {
    let connection = state.database_client.get_connection().map_err(internal_error)?;
    let dataset_repository = catalog_infra_db::repositories::DatasetRepository::new(connection);
    let dataset = dataset_repository
        .find(file_id)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "unknown file_id" }))))?;
    Ok(dataset.table_name)
}

fn mode_label(mode: SearchMode) -> &'static str {
    match mode {
        SearchMode::Exact => "exact",
        SearchMode::Fuzzy => "fuzzy",
        SearchMode::Hybrid => "hybrid",
    }
}

fn internal_error(error: impl ToString) -> (StatusCode, Json<Value>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": error.to_string() })))
}
