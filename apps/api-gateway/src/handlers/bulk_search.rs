//! Bulk search driven by an uploaded list of part numbers rather than a
//! JSON array (spec.md §4.8's "bulk-excel-search" surface): the caller
//! multipart-uploads a small file of part numbers, one per line, against an
//! already-ingested dataset.

use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use catalog_domain_models::SearchMode;
use serde_json::{json, Value};

const MAX_BULK_UPLOAD_PARTS: usize = 50_000;

pub async fn bulk_excel_search(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut file_id: Option<i64> = None;
    let mut part_numbers: Vec<String> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(internal_error)? {
        match field.name() {
            Some("file_id") => {
                let text = field.text().await.map_err(internal_error)?;
                file_id = text.trim().parse().ok();
            }
            Some("file") => {
                let bytes = field.bytes().await.map_err(internal_error)?;
                let text = String::from_utf8_lossy(&bytes);
                part_numbers = text
                    .lines()
                    .map(|line| line.trim().to_string())
                    .filter(|line| !line.is_empty())
                    .take(MAX_BULK_UPLOAD_PARTS)
                    .collect();
            }
            _ => {}
        }
    }

    let file_id = file_id.ok_or((StatusCode::BAD_REQUEST, Json(json!({ "error": "missing file_id field" }))))?;
    if part_numbers.is_empty() {
        return Err((StatusCode::BAD_REQUEST, Json(json!({ "error": "uploaded part-number file was empty" }))));
    }

    let connection = state.database_client.get_connection().map_err(internal_error)?;
    let dataset_repository = catalog_infra_db::repositories::DatasetRepository::new(connection);
    let dataset = dataset_repository
        .find(file_id)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "unknown file_id" }))))?;

    let engine =
        state.build_search_engine(file_id, &dataset.table_name).map_err(internal_error)?;
    let results = engine.search_bulk_parts(&part_numbers, SearchMode::Hybrid, 1, 50, false).await;

    Ok(Json(json!({ "file_id": file_id, "submitted": part_numbers.len(), "results": results })))
}

fn internal_error(error: impl ToString) -> (StatusCode, Json<Value>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": error.to_string() })))
}
