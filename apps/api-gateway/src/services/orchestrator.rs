//! Worker orchestrator (component L): drives parse → ingest → index sync →
//! cache warm for one uploaded file, publishing progress as it goes.
//!
//! Grounded on the teacher's `kernel.rs::launch_sovereign_operations`
//! daemon-fan-out shape (one `tokio::spawn` per unit of background work)
//! and on the original pipeline's `batch_processor.py` end-to-end
//! progress-publishing sequence. Unlike the teacher's perpetual daemons,
//! one task is spawned per accepted upload and exits when that file's
//! pipeline completes (spec.md §5: "one active job per file_id").

use crate::config::{CACHE_WARMUP_TOP_N, PROGRESS_PUBLISH_EVERY_N_BATCHES};
use crate::state::AppState;
use catalog_core_parser::iter_rows;
use catalog_domain_models::{DatasetStatus, ProgressMessage};
use catalog_infra_db::repositories::{adaptive_batch_size, DatasetRepository};
use catalog_infra_search_index::{sync_file, IndexSyncError, SyncableRow};
use libsql::params;
use reqwest::Client;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Drives the whole pipeline for `file_id` and its just-uploaded temp file,
/// then deletes the temp file regardless of outcome.
pub async fn run(app_state: AppState, file_id: i64, file_path: PathBuf, filename: String, byte_size: u64) {
    let outcome = run_pipeline(&app_state, file_id, &file_path, &filename, byte_size).await;

    if let Err(error) = tokio::fs::remove_file(&file_path).await {
        warn!(file_id, path = %file_path.display(), error = %error, "failed to remove consumed upload temp file");
    }

    if let Err(error) = &outcome {
        error!(file_id, error = %error, "ingestion pipeline failed");
        app_state.event_bus.publish(ProgressMessage::Error { file_id, reason: error.to_string() });
        if let Ok(connection) = app_state.database_client.get_connection() {
            let dataset_repository = DatasetRepository::new(connection);
            let _ = dataset_repository.set_status(file_id, DatasetStatus::Failed).await;
        }
    }

    app_state.event_bus.retire(file_id);
}

async fn run_pipeline(
    app_state: &AppState,
    file_id: i64,
    file_path: &PathBuf,
    filename: &str,
    byte_size: u64,
) -> anyhow::Result<()> {
    let connection = app_state.database_client.get_connection()?;
    let dataset_repository = DatasetRepository::new(connection);

    // 1. Set status `processing`; publish `processing_started`.
    dataset_repository.set_status(file_id, DatasetStatus::Processing).await?;
    app_state.event_bus.publish(ProgressMessage::ProcessingStarted { file_id });

    // 3. Drive D -> E until exhausted or cancelled.
    let table_name = dataset_repository.ensure_table(file_id).await?;
    let skip_rows = dataset_repository.committed_row_count(&table_name).await? as usize;
    let chunk_size = adaptive_batch_size(byte_size);

    let batches = iter_rows(file_path, filename, chunk_size, skip_rows)?;
    let mut total_inserted: i64 = skip_rows as i64;
    let mut total_dropped: i64 = 0;
    let mut batch_count: u64 = 0;
    let mut cancelled = false;

    for batch in batches {
        let batch = batch?;
        total_dropped += batch.dropped as i64;

        if !batch.rows.is_empty() {
            let inserted = dataset_repository.insert_batch(&table_name, &batch.rows).await?;
            total_inserted += inserted;
        }

        batch_count += 1;
        dataset_repository.set_row_count(file_id, total_inserted).await?;
        dataset_repository.set_dropped_rows(file_id, total_dropped).await?;

        if batch_count % PROGRESS_PUBLISH_EVERY_N_BATCHES == 0 {
            app_state.event_bus.publish(ProgressMessage::BatchProgress {
                file_id,
                processed_rows: total_inserted,
                current_batch: batch_count,
                dropped_rows: total_dropped,
            });
        }

        // Cooperative cancellation, polled once per batch (spec.md §4.5.4).
        if let Some(dataset) = dataset_repository.find(file_id).await? {
            if dataset.status == DatasetStatus::Cancelled {
                cancelled = true;
                break;
            }
        }
    }

    info!(file_id, inserted = total_inserted, dropped = total_dropped, "ingestion batches exhausted");

    if cancelled {
        app_state.event_bus.publish(ProgressMessage::ProcessingComplete {
            file_id,
            total_rows: total_inserted,
            index_synced: false,
            dropped_rows: total_dropped,
        });
        return Ok(());
    }

    // 4. Run F (index sync). Failure is recorded but never moves status
    // back to `failed` (spec.md §4.12's final note).
    let index_synced = match sync_index(app_state, file_id, &table_name).await {
        Ok(synced_count) => {
            dataset_repository.set_sync_outcome(file_id, true, None).await?;
            app_state.event_bus.publish(ProgressMessage::IndexSyncProgress { file_id, synced_rows: synced_count });
            true
        }
        Err(error) => {
            warn!(file_id, error = %error, "index sync failed, dataset remains processed");
            dataset_repository.set_sync_outcome(file_id, false, Some(&error.to_string())).await?;
            false
        }
    };

    // 5. Warm J with up to CACHE_WARMUP_TOP_N most frequent part numbers.
    if let Err(error) = warm_cache(app_state, file_id, &table_name).await {
        warn!(file_id, error = %error, "cache warm-up failed, continuing");
    }

    // 6. Set final status and publish `processing_complete`.
    dataset_repository.set_status(file_id, DatasetStatus::Processed).await?;
    app_state.event_bus.publish(ProgressMessage::ProcessingComplete {
        file_id,
        total_rows: total_inserted,
        index_synced,
        dropped_rows: total_dropped,
    });

    Ok(())
}

async fn sync_index(app_state: &AppState, file_id: i64, table_name: &str) -> Result<i64, IndexSyncError> {
    let Some(endpoint) = app_state.settings.search_index_endpoint.clone() else {
        return Ok(0);
    };
    let api_key = app_state.settings.search_index_api_key.clone();
    let http = Client::new();
    let connection = app_state.database_client.get_connection().map_err(|e| {
        IndexSyncError::UpsertRejected { offset: -1, detail: e.to_string() }
    })?;
    let table_name = table_name.to_string();

    sync_file(&http, &endpoint, api_key.as_deref(), file_id, move |offset, limit| {
        let connection = connection.clone();
        let table_name = table_name.clone();
        async move { fetch_sync_page(&connection, &table_name, offset, limit).await }
    })
    .await
}

async fn fetch_sync_page(
    connection: &libsql::Connection,
    table_name: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<SyncableRow>, IndexSyncError> {
    let sql = format!(
        "SELECT id, part_number, item_description, primary_buyer, quantity, unit_of_measure, unit_price \
         FROM {table_name} ORDER BY id LIMIT ?1 OFFSET ?2"
    );
    let mut rows = connection
        .query(&sql, params![limit, offset])
        .await
        .map_err(|e| IndexSyncError::UpsertRejected { offset, detail: e.to_string() })?;

    let mut out = Vec::new();
    loop {
        match rows.next().await {
            Ok(Some(row)) => {
                let syncable = SyncableRow {
                    row_id: row.get(0).unwrap_or_default(),
                    part_number: row.get::<Option<String>>(1).ok().flatten().unwrap_or_default(),
                    item_description: row.get::<Option<String>>(2).ok().flatten().unwrap_or_default(),
                    company_name: row.get::<Option<String>>(3).ok().flatten().unwrap_or_default(),
                    quantity: row.get(4).unwrap_or_default(),
                    unit_of_measure: row.get::<Option<String>>(5).ok().flatten().unwrap_or_default(),
                    unit_price: row.get(6).unwrap_or_default(),
                };
                out.push(syncable);
            }
            Ok(None) => break,
            Err(e) => return Err(IndexSyncError::UpsertRejected { offset, detail: e.to_string() }),
        }
    }
    Ok(out)
}

async fn warm_cache(app_state: &AppState, file_id: i64, table_name: &str) -> anyhow::Result<()> {
    let connection = app_state.database_client.get_connection()?;
    let sql = format!(
        "SELECT part_number, COUNT(*) as occurrences FROM {table_name} \
         WHERE part_number IS NOT NULL AND part_number != '' \
         GROUP BY part_number ORDER BY occurrences DESC LIMIT ?1"
    );
    let mut rows = connection.query(&sql, params![CACHE_WARMUP_TOP_N as i64]).await?;

    let mut top_parts = Vec::new();
    while let Some(row) = rows.next().await? {
        if let Ok(part) = row.get::<String>(0) {
            top_parts.push(part);
        }
    }

    if top_parts.is_empty() {
        return Ok(());
    }

    let engine = app_state.build_search_engine(file_id, table_name)?;
    for part in top_parts {
        let result = engine
            .search_single_part(&part, catalog_domain_models::SearchMode::Hybrid, 1, 50, false)
            .await;
        let key = catalog_infra_cache::cache_key(
            catalog_infra_cache::CacheOperation::SingleSearch,
            Some(file_id),
            &[part],
            "hybrid",
            50,
            false,
        );
        app_state.cache.put_warmup(key, catalog_infra_cache::CachedResult::from_search_result(&result)).await;
    }

    Ok(())
}
