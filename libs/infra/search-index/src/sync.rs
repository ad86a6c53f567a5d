//! Index sync (component F): pushes every row of a dataset's table into the
//! external search index, keyed `<file_id>_<row_id>`, paginating in
//! fixed-size batches and refreshing once at the end.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Rows are synced this many at a time (spec.md §4.6).
pub const SYNC_BATCH_SIZE: i64 = 1000;
const SYNC_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Error)]
pub enum IndexSyncError {
    #[error("[F1_NETWORK_FAULT] {0}")]
    Network(#[from] reqwest::Error),
    #[error("[F2_UPSERT_REJECTED] index rejected batch at offset {offset}: {detail}")]
    UpsertRejected { offset: i64, detail: String },
}

/// The projection a caller must hand `sync_file` for each row; intentionally
/// narrow (spec.md §4.6: `part_number` indexed both analyzed and exact, row
/// carries `file_id` as a discriminator).
#[derive(Debug, Clone, Serialize)]
pub struct SyncableRow {
    pub row_id: i64,
    pub part_number: String,
    pub item_description: String,
    pub company_name: String,
    pub quantity: i64,
    pub unit_of_measure: String,
    pub unit_price: f64,
}

#[derive(Debug, Serialize)]
struct UpsertBatchRequest<'a> {
    file_id: i64,
    documents: Vec<IndexDocument<'a>>,
}

#[derive(Debug, Serialize)]
struct IndexDocument<'a> {
    id: String,
    file_id: i64,
    part_number: &'a str,
    part_number_exact: &'a str,
    item_description: &'a str,
    company_name: &'a str,
    quantity: i64,
    unit_of_measure: &'a str,
    unit_price: f64,
}

/// Syncs `file_id`'s rows into the index at `endpoint`, paginating through
/// `fetch_page` (a caller-supplied page source, typically backed by the
/// relational store) in batches of [`SYNC_BATCH_SIZE`], upserting each
/// batch, and issuing a final refresh. Idempotent: re-running overwrites by
/// document id. Aborts (without partial cleanup) on the first batch
/// failure, matching spec.md §4.6's "failure of any batch aborts" rule.
pub async fn sync_file<F, Fut>(
    http: &Client,
    endpoint: &str,
    api_key: Option<&str>,
    file_id: i64,
    mut fetch_page: F,
) -> Result<i64, IndexSyncError>
where
    F: FnMut(i64, i64) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<SyncableRow>, IndexSyncError>>,
{
    let mut offset = 0;
    let mut synced = 0;

    loop {
        let rows = fetch_page(offset, SYNC_BATCH_SIZE).await?;
        if rows.is_empty() {
            break;
        }

        let documents: Vec<IndexDocument> = rows
            .iter()
            .map(|row| IndexDocument {
                id: format!("{file_id}_{}", row.row_id),
                file_id,
                part_number: &row.part_number,
                part_number_exact: &row.part_number,
                item_description: &row.item_description,
                company_name: &row.company_name,
                quantity: row.quantity,
                unit_of_measure: &row.unit_of_measure,
                unit_price: row.unit_price,
            })
            .collect();
        let batch_len = documents.len() as i64;

        let mut req = http
            .post(format!("{endpoint}/bulk_upsert"))
            .timeout(SYNC_TIMEOUT)
            .json(&UpsertBatchRequest { file_id, documents });
        if let Some(key) = api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            return Err(IndexSyncError::UpsertRejected {
                offset,
                detail: response.status().to_string(),
            });
        }

        synced += batch_len;
        offset += SYNC_BATCH_SIZE;
        if batch_len < SYNC_BATCH_SIZE {
            break;
        }
    }

    if synced > 0 {
        refresh(http, endpoint, api_key, file_id).await?;
    }
    Ok(synced)
}

async fn refresh(
    http: &Client,
    endpoint: &str,
    api_key: Option<&str>,
    file_id: i64,
) -> Result<(), IndexSyncError> {
    let mut req = http
        .post(format!("{endpoint}/refresh"))
        .timeout(SYNC_TIMEOUT)
        .json(&serde_json::json!({ "file_id": file_id }));
    if let Some(key) = api_key {
        req = req.bearer_auth(key);
    }
    let response = req.send().await?;
    if !response.status().is_success() {
        return Err(IndexSyncError::UpsertRejected {
            offset: -1,
            detail: format!("refresh failed: {}", response.status()),
        });
    }
    Ok(())
}
