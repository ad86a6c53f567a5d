//! On-demand index sync (component F) triggered over HTTP instead of
//! waiting for the next upload's automatic sync.

use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use catalog_infra_db::repositories::DatasetRepository;
use serde_json::{json, Value};

pub async fn sync_file(
    State(state): State<AppState>,
    Path(file_id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let connection = state.database_client.get_connection().map_err(internal_error)?;
    let dataset_repository = DatasetRepository::new(connection);
    let dataset = dataset_repository
        .find(file_id)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "unknown file_id" }))))?;

    let background_state = state.clone();
    let table_name = dataset.table_name.clone();
    tokio::spawn(async move {
        let http = reqwest::Client::new();
        let Some(endpoint) = background_state.settings.search_index_endpoint.clone() else {
            return;
        };
        let api_key = background_state.settings.search_index_api_key.clone();
        let Ok(connection) = background_state.database_client.get_connection() else {
            return;
        };

        let outcome = catalog_infra_search_index::sync_file(&http, &endpoint, api_key.as_deref(), file_id, {
            let table_name = table_name.clone();
            move |offset, limit| {
                let connection = connection.clone();
                let table_name = table_name.clone();
                async move { fetch_page(&connection, &table_name, offset, limit).await }
            }
        })
        .await;

        if let Ok(sync_connection) = background_state.database_client.get_connection() {
            let repository = DatasetRepository::new(sync_connection);
            match outcome {
                Ok(_) => {
                    let _ = repository.set_sync_outcome(file_id, true, None).await;
                }
                Err(error) => {
                    let _ = repository.set_sync_outcome(file_id, false, Some(&error.to_string())).await;
                }
            }
        }
    });

    Ok(Json(json!({ "file_id": file_id, "status": "sync_started" })))
}

pub async fn sync_all(State(state): State<AppState>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let connection = state.database_client.get_connection().map_err(internal_error)?;
    let dataset_repository = DatasetRepository::new(connection);
    let datasets = dataset_repository.list().await.map_err(internal_error)?;
    let file_ids: Vec<i64> = datasets
        .into_iter()
        .filter(|d| d.status == catalog_domain_models::DatasetStatus::Processed)
        .map(|d| d.file_id)
        .collect();

    for file_id in &file_ids {
        let response = sync_file(State(state.clone()), Path(*file_id)).await;
        if response.is_err() {
            tracing::warn!(file_id, "sync-all skipped a file that could not be scheduled");
        }
    }

    Ok(Json(json!({ "scheduled": file_ids })))
}

pub async fn sync_status(
    State(state): State<AppState>,
    Path(file_id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let connection = state.database_client.get_connection().map_err(internal_error)?;
    let dataset_repository = DatasetRepository::new(connection);
    let dataset = dataset_repository
        .find(file_id)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "unknown file_id" }))))?;

    Ok(Json(json!({
        "file_id": file_id,
        "index_synced": dataset.index_synced,
        "last_sync_error": dataset.last_sync_error,
    })))
}

async fn fetch_page(
    connection: &libsql::Connection,
    table_name: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<catalog_infra_search_index::SyncableRow>, catalog_infra_search_index::IndexSyncError> {
    use libsql::params;

    let sql = format!(
        "SELECT id, part_number, item_description, primary_buyer, quantity, unit_of_measure, unit_price \
         FROM {table_name} ORDER BY id LIMIT ?1 OFFSET ?2"
    );
    let mut rows = connection.query(&sql, params![limit, offset]).await.map_err(|e| {
        catalog_infra_search_index::IndexSyncError::UpsertRejected { offset, detail: e.to_string() }
    })?;

    let mut out = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| catalog_infra_search_index::IndexSyncError::UpsertRejected { offset, detail: e.to_string() })?
    {
        out.push(catalog_infra_search_index::SyncableRow {
            row_id: row.get(0).unwrap_or_default(),
            part_number: row.get::<Option<String>>(1).ok().flatten().unwrap_or_default(),
            item_description: row.get::<Option<String>>(2).ok().flatten().unwrap_or_default(),
            company_name: row.get::<Option<String>>(3).ok().flatten().unwrap_or_default(),
            quantity: row.get(4).unwrap_or_default(),
            unit_of_measure: row.get::<Option<String>>(5).ok().flatten().unwrap_or_default(),
            unit_price: row.get(6).unwrap_or_default(),
        });
    }
    Ok(out)
}

fn internal_error(error: impl ToString) -> (StatusCode, Json<Value>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": error.to_string() })))
}
