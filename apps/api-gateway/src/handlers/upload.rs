//! Chunked upload surface (component I, spec.md §4.9): a dataset row and an
//! upload session are created together, raw bytes are appended to a temp
//! file chunk by chunk, and `complete` hands the finished file to the
//! background orchestrator (component L).

use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use catalog_infra_db::repositories::DatasetRepository;
use libsql::params;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Deserialize)]
pub struct InitRequest {
    pub filename: String,
    pub content_type: String,
    pub declared_total: Option<u64>,
}

pub async fn init(
    State(state): State<AppState>,
    Json(request): Json<InitRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let connection = state.database_client.get_connection().map_err(internal_error)?;
    let dataset_repository = DatasetRepository::new(connection);
    let byte_size = request.declared_total.unwrap_or(0) as i64;
    let dataset = dataset_repository
        .create(&request.filename, &request.content_type, byte_size)
        .await
        .map_err(internal_error)?;

    tokio::fs::create_dir_all(&state.settings.upload_temp_dir).await.map_err(internal_error)?;
    let temp_path = PathBuf::from(&state.settings.upload_temp_dir).join(format!("upload_{}.part", dataset.file_id));
    tokio::fs::File::create(&temp_path).await.map_err(internal_error)?;

    let session = state.upload_sessions.init(
        dataset.file_id,
        temp_path.to_string_lossy().into_owned(),
        request.filename,
        request.content_type,
    );

    Ok(Json(json!({ "upload_id": session.upload_id, "file_id": dataset.file_id })))
}

pub async fn part(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
    body: axum::body::Bytes,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let session = state
        .upload_sessions
        .get(&upload_id)
        .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "unknown upload session" }))))?;

    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .open(&session.temp_path)
        .await
        .map_err(internal_error)?;
    file.write_all(&body).await.map_err(internal_error)?;

    let updated = state
        .upload_sessions
        .record_bytes_received(&upload_id, body.len() as u64)
        .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "unknown upload session" }))))?;

    Ok(Json(json!({ "received_bytes": updated.received_bytes })))
}

pub async fn complete(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let session = state
        .upload_sessions
        .mark_completing(&upload_id)
        .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "unknown upload session" }))))?;

    state.upload_sessions.remove(&upload_id);

    let file_id = session.file_id;
    let file_path = PathBuf::from(&session.temp_path);
    let filename = session.filename.clone();
    let byte_size = session.received_bytes;
    let background_state = state.clone();

    tokio::spawn(async move {
        crate::services::orchestrator::run(background_state, file_id, file_path, filename, byte_size).await;
    });

    Ok(Json(json!({ "file_id": file_id, "status": "processing" })))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let session = state
        .upload_sessions
        .remove(&upload_id)
        .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "unknown upload session" }))))?;

    let connection = state.database_client.get_connection().map_err(internal_error)?;
    let dataset_repository = DatasetRepository::new(connection);
    dataset_repository
        .set_status(session.file_id, catalog_domain_models::DatasetStatus::Cancelled)
        .await
        .map_err(internal_error)?;

    let _ = tokio::fs::remove_file(&session.temp_path).await;

    Ok(Json(json!({ "file_id": session.file_id, "status": "cancelled" })))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let connection = state.database_client.get_connection().map_err(internal_error)?;
    let dataset_repository = DatasetRepository::new(connection);
    let datasets = dataset_repository.list().await.map_err(internal_error)?;
    Ok(Json(json!({ "datasets": datasets })))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    50
}

pub async fn rows(
    State(state): State<AppState>,
    Path(file_id): Path<i64>,
    Query(page_query): Query<PageQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let connection = state.database_client.get_connection().map_err(internal_error)?;
    let dataset_repository = DatasetRepository::new(connection.clone());
    let dataset = dataset_repository
        .find(file_id)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "unknown file_id" }))))?;

    let offset = (page_query.page.saturating_sub(1) * page_query.page_size) as i64;
    let sql = format!(
        "SELECT part_number, item_description, primary_buyer, quantity, unit_of_measure, unit_price \
         FROM {} ORDER BY id LIMIT ?1 OFFSET ?2",
        dataset.table_name
    );
    let mut result_rows = connection
        .query(&sql, params![page_query.page_size as i64, offset])
        .await
        .map_err(internal_error)?;

    let mut rows_out = Vec::new();
    while let Some(row) = result_rows.next().await.map_err(internal_error)? {
        rows_out.push(json!({
            "part_number": row.get::<Option<String>>(0).ok().flatten(),
            "item_description": row.get::<Option<String>>(1).ok().flatten(),
            "company_name": row.get::<Option<String>>(2).ok().flatten(),
            "quantity": row.get::<i64>(3).unwrap_or_default(),
            "unit_of_measure": row.get::<Option<String>>(4).ok().flatten(),
            "unit_price": row.get::<f64>(5).unwrap_or_default(),
        }));
    }

    Ok(Json(json!({
        "file_id": file_id,
        "page": page_query.page,
        "page_size": page_query.page_size,
        "row_count": dataset.row_count,
        "rows": rows_out,
    })))
}

fn internal_error(error: impl ToString) -> (StatusCode, Json<Value>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": error.to_string() })))
}
