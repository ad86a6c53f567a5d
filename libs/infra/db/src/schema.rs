//! Idempotent schema application for dataset metadata (spec.md §3's
//! "Dataset" record). Per-dataset physical tables (`ds_<file_id>`) are
//! created separately, on first ingest, by `repositories::dataset_repository`
//! — this module only owns the fixed, always-present tables.
//!
//! Kept in three strata exactly as the teacher structures it: base tables,
//! additive column evolution (tolerant of "duplicate column name" on
//! re-apply), then indexes. Evolutionary ALTERs let an older deployed
//! schema pick up new optional columns without a destructive migration.

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

const TACTICAL_TABLES: &[(&str, &str)] = &[
    (
        "TABLE_DATASETS",
        r#"
            CREATE TABLE IF NOT EXISTS datasets (
                file_id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                mime_type TEXT,
                byte_size INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'uploaded',
                table_name TEXT,
                row_count INTEGER NOT NULL DEFAULT 0,
                index_synced INTEGER NOT NULL DEFAULT 0,
                last_sync_error TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    ),
    (
        "TABLE_USERS",
        r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    ),
    (
        "TABLE_QUERY_LOG",
        r#"
            CREATE TABLE IF NOT EXISTS query_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_id INTEGER,
                part_numbers_count INTEGER NOT NULL DEFAULT 1,
                search_mode TEXT NOT NULL,
                search_engine TEXT NOT NULL,
                total_matches INTEGER NOT NULL DEFAULT 0,
                latency_ms INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    ),
];

const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    ("DATASET_CANCELLED_AT", "ALTER TABLE datasets ADD COLUMN cancelled_at DATETIME"),
    ("DATASET_COMPLETED_AT", "ALTER TABLE datasets ADD COLUMN completed_at DATETIME"),
    ("DATASET_DROPPED_ROWS", "ALTER TABLE datasets ADD COLUMN dropped_rows INTEGER NOT NULL DEFAULT 0"),
];

const ACCELERATION_INDEXES: &[(&str, &str)] = &[(
    "IDX_DATASETS_STATUS",
    "CREATE INDEX IF NOT EXISTS idx_datasets_status ON datasets(status);",
)];

#[instrument(skip(database_connection))]
pub async fn apply_schema(database_connection: &Connection) -> Result<()> {
    info!("applying dataset metadata schema");
    solidify_base_strata(database_connection).await?;
    execute_evolutionary_repair(database_connection).await?;
    harden_access_layer(database_connection).await?;
    info!("dataset metadata schema current");
    Ok(())
}

async fn solidify_base_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in TACTICAL_TABLES {
        debug!("creating {}", identifier);
        db.execute(sql, ())
            .await
            .with_context(|| format!("failed to create {identifier}"))?;
    }
    Ok(())
}

async fn execute_evolutionary_repair(db: &Connection) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        match db.execute(sql, ()).await {
            Ok(_) => info!("applied evolutionary column {}", identifier),
            Err(e) => {
                let message = e.to_string();
                if message.contains("duplicate column name") {
                    debug!("{} already applied", identifier);
                } else {
                    warn!("{} check incomplete: {}", identifier, message);
                }
            }
        }
    }
    Ok(())
}

async fn harden_access_layer(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("hardening {}", identifier);
        db.execute(sql, ())
            .await
            .with_context(|| format!("failed to create {identifier}"))?;
    }
    Ok(())
}
