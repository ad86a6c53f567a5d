//! Dataset metadata CRUD and the batch ingester (component E).
//!
//! Grounded on `batch_processor.py`'s `process_in_batches`/`_safe_insert`:
//! adaptive batch sizing by declared file size, a resumable row count read
//! once at startup, and halve-and-retry insertion that isolates a single
//! poison row to a batch of one before dropping it.

use crate::errors::DbError;
use catalog_domain_models::{Dataset, DatasetRow, DatasetStatus};
use libsql::{params, Connection};
use tracing::{debug, instrument, warn};

/// Above this declared size, the caller should request the larger
/// streaming batch size (spec.md §4.4's "massive file" threshold).
pub const MASSIVE_FILE_THRESHOLD_BYTES: u64 = 200 * 1024 * 1024;
pub const STANDARD_BATCH_SIZE: usize = 2000;
pub const STREAMING_BATCH_SIZE: usize = 20_000;

/// Picks a parser batch size for a file of `declared_bytes`, per spec.md
/// §4.4's adaptive sizing rule.
pub fn adaptive_batch_size(declared_bytes: u64) -> usize {
    if declared_bytes >= MASSIVE_FILE_THRESHOLD_BYTES {
        STREAMING_BATCH_SIZE
    } else {
        STANDARD_BATCH_SIZE
    }
}

pub struct DatasetRepository {
    connection: Connection,
}

impl DatasetRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, filename: &str, mime_type: &str, byte_size: i64) -> Result<Dataset, DbError> {
        let mut rows = self
            .connection
            .query(
                "INSERT INTO datasets (filename, mime_type, byte_size, status) VALUES (?1, ?2, ?3, ?4) \
                 RETURNING file_id",
                params![filename, mime_type, byte_size, DatasetStatus::Uploaded.as_str()],
            )
            .await?;
        let file_id: i64 = rows
            .next()
            .await?
            .ok_or_else(|| DbError::MappingError("insert did not return a file_id".into()))?
            .get(0)?;
        let table_name = Dataset::table_name_for(file_id);
        self.connection
            .execute(
                "UPDATE datasets SET table_name = ?1 WHERE file_id = ?2",
                params![table_name.clone(), file_id],
            )
            .await?;
        self.find(file_id).await?.ok_or(DbError::DatasetNotFound)
    }

    pub async fn find(&self, file_id: i64) -> Result<Option<Dataset>, DbError> {
        let mut rows = self
            .connection
            .query(
                "SELECT file_id, filename, mime_type, byte_size, status, row_count, index_synced, \
                 last_sync_error, table_name, dropped_rows FROM datasets WHERE file_id = ?1",
                params![file_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_dataset(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self) -> Result<Vec<Dataset>, DbError> {
        let mut rows = self
            .connection
            .query(
                "SELECT file_id, filename, mime_type, byte_size, status, row_count, index_synced, \
                 last_sync_error, table_name, dropped_rows FROM datasets ORDER BY file_id DESC",
                (),
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(row_to_dataset(&row)?);
        }
        Ok(out)
    }

    pub async fn set_status(&self, file_id: i64, status: DatasetStatus) -> Result<(), DbError> {
        self.connection
            .execute(
                "UPDATE datasets SET status = ?1, updated_at = CURRENT_TIMESTAMP WHERE file_id = ?2",
                params![status.as_str(), file_id],
            )
            .await?;
        Ok(())
    }

    pub async fn set_row_count(&self, file_id: i64, row_count: i64) -> Result<(), DbError> {
        self.connection
            .execute(
                "UPDATE datasets SET row_count = ?1, updated_at = CURRENT_TIMESTAMP WHERE file_id = ?2",
                params![row_count, file_id],
            )
            .await?;
        Ok(())
    }

    /// Records the running count of source rows `validate_row` rejected
    /// during ingestion (spec.md §7.6), so it is observable on the dataset's
    /// metadata rather than only in a log line.
    pub async fn set_dropped_rows(&self, file_id: i64, dropped_rows: i64) -> Result<(), DbError> {
        self.connection
            .execute(
                "UPDATE datasets SET dropped_rows = ?1, updated_at = CURRENT_TIMESTAMP WHERE file_id = ?2",
                params![dropped_rows, file_id],
            )
            .await?;
        Ok(())
    }

    pub async fn set_sync_outcome(&self, file_id: i64, synced: bool, error: Option<&str>) -> Result<(), DbError> {
        self.connection
            .execute(
                "UPDATE datasets SET index_synced = ?1, last_sync_error = ?2, updated_at = CURRENT_TIMESTAMP \
                 WHERE file_id = ?3",
                params![synced as i64, error, file_id],
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, file_id: i64) -> Result<(), DbError> {
        let dataset = self.find(file_id).await?.ok_or(DbError::DatasetNotFound)?;
        self.connection
            .execute(&format!("DROP TABLE IF EXISTS {}", dataset.table_name), ())
            .await?;
        self.connection.execute("DELETE FROM datasets WHERE file_id = ?1", params![file_id]).await?;
        Ok(())
    }

    /// Creates `ds_<file_id>` if it doesn't already exist (spec.md §4.5.1).
    #[instrument(skip(self))]
    pub async fn ensure_table(&self, file_id: i64) -> Result<String, DbError> {
        let table_name = Dataset::table_name_for(file_id);
        self.connection
            .execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {table_name} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        primary_buyer TEXT,
                        item_description TEXT,
                        quantity INTEGER NOT NULL DEFAULT 0,
                        unit_of_measure TEXT,
                        unit_price REAL NOT NULL DEFAULT 0,
                        secondary_buyer TEXT,
                        primary_buyer_contact TEXT,
                        primary_buyer_email TEXT,
                        part_number TEXT
                    );"
                ),
                (),
            )
            .await?;
        self.connection
            .execute(
                &format!("CREATE INDEX IF NOT EXISTS idx_{table_name}_part ON {table_name}(part_number);"),
                (),
            )
            .await?;
        self.connection
            .execute(
                &format!("CREATE INDEX IF NOT EXISTS idx_{table_name}_qty_price ON {table_name}(quantity, unit_price);"),
                (),
            )
            .await?;
        // Trigram-style acceleration on description has no first-class libSQL
        // equivalent to Postgres GIN; an ordinary index still speeds prefix
        // and exact lookups used by the fallback token search (G2).
        if let Err(e) = self
            .connection
            .execute(
                &format!("CREATE INDEX IF NOT EXISTS idx_{table_name}_desc ON {table_name}(item_description);"),
                (),
            )
            .await
        {
            warn!(table = table_name, error = %e, "opportunistic description index failed, continuing");
        }
        Ok(table_name)
    }

    /// Rows already committed to `table_name`; the resume offset for
    /// `skip_rows` (spec.md §4.5.3).
    pub async fn committed_row_count(&self, table_name: &str) -> Result<i64, DbError> {
        let mut rows = self.connection.query(&format!("SELECT COUNT(*) FROM {table_name}"), ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    /// Inserts `rows` into `table_name`, splitting the batch in half and
    /// retrying on failure until single rows are isolated and dropped
    /// (spec.md §4.5.5). Returns the count actually inserted.
    #[instrument(skip(self, rows), fields(table = table_name, attempted = rows.len()))]
    pub async fn insert_batch(&self, table_name: &str, rows: &[DatasetRow]) -> Result<i64, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        match self.try_insert_all(table_name, rows).await {
            Ok(()) => Ok(rows.len() as i64),
            Err(e) => {
                if rows.len() == 1 {
                    warn!(table = table_name, error = %e, "dropping one row that could not be inserted");
                    return Ok(0);
                }
                debug!(table = table_name, size = rows.len(), "batch insert failed, splitting in half");
                let mid = rows.len() / 2;
                let left = Box::pin(self.insert_batch(table_name, &rows[..mid])).await?;
                let right = Box::pin(self.insert_batch(table_name, &rows[mid..])).await?;
                Ok(left + right)
            }
        }
    }

    async fn try_insert_all(&self, table_name: &str, rows: &[DatasetRow]) -> Result<(), DbError> {
        let transaction = self.connection.transaction().await?;
        let sql = format!(
            "INSERT INTO {table_name} (primary_buyer, item_description, quantity, \
             unit_of_measure, unit_price, secondary_buyer, primary_buyer_contact, \
             primary_buyer_email, part_number) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        );
        for row in rows {
            transaction
                .execute(
                    &sql,
                    params![
                        row.primary_buyer.clone(),
                        row.item_description.clone(),
                        row.quantity,
                        row.unit_of_measure.clone(),
                        row.unit_price,
                        row.secondary_buyer.clone(),
                        row.primary_buyer_contact.clone(),
                        row.primary_buyer_email.clone(),
                        row.part_number.clone(),
                    ],
                )
                .await?;
        }
        transaction.commit().await?;
        Ok(())
    }
}

fn row_to_dataset(row: &libsql::Row) -> Result<Dataset, DbError> {
    let status_str: String = row.get(4)?;
    let status = DatasetStatus::from_str(&status_str)
        .ok_or_else(|| DbError::MappingError(format!("unknown dataset status '{status_str}'")))?;
    Ok(Dataset {
        file_id: row.get(0)?,
        filename: row.get(1)?,
        mime_type: row.get(2)?,
        byte_size: row.get(3)?,
        status,
        row_count: row.get(5)?,
        index_synced: row.get::<i64>(6)? != 0,
        last_sync_error: row.get(7)?,
        table_name: row.get::<Option<String>>(8)?.unwrap_or_default(),
        dropped_rows: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_batch_size_switches_at_the_massive_threshold() {
        assert_eq!(adaptive_batch_size(1024), STANDARD_BATCH_SIZE);
        assert_eq!(adaptive_batch_size(MASSIVE_FILE_THRESHOLD_BYTES), STREAMING_BATCH_SIZE);
        assert_eq!(adaptive_batch_size(MASSIVE_FILE_THRESHOLD_BYTES + 1), STREAMING_BATCH_SIZE);
    }
}
