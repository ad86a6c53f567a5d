//! Canonical dataset row and dataset metadata (spec.md §3).

use serde::{Deserialize, Serialize};

/// One row normalized onto the fixed canonical schema (spec.md §4.3).
///
/// `part_number` is always derived, never taken verbatim from the source
/// file unless the source already happens to carry a column that maps onto
/// it during canonicalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetRow {
    pub primary_buyer: String,
    pub item_description: String,
    pub quantity: i64,
    pub unit_of_measure: String,
    pub unit_price: f64,
    pub secondary_buyer: Option<String>,
    pub primary_buyer_contact: Option<String>,
    pub primary_buyer_email: Option<String>,
    pub part_number: Option<String>,
}

/// Lifecycle status of a dataset (spec.md §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DatasetStatus {
    Uploaded,
    Processing,
    Processed,
    Failed,
    Cancelled,
}

impl DatasetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetStatus::Uploaded => "uploaded",
            DatasetStatus::Processing => "processing",
            DatasetStatus::Processed => "processed",
            DatasetStatus::Failed => "failed",
            DatasetStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "uploaded" => Some(DatasetStatus::Uploaded),
            "processing" => Some(DatasetStatus::Processing),
            "processed" => Some(DatasetStatus::Processed),
            "failed" => Some(DatasetStatus::Failed),
            "cancelled" => Some(DatasetStatus::Cancelled),
            _ => None,
        }
    }
}

/// Metadata record owned by the dataset-metadata table (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub file_id: i64,
    pub filename: String,
    pub byte_size: i64,
    pub mime_type: String,
    pub status: DatasetStatus,
    pub row_count: i64,
    pub dropped_rows: i64,
    pub index_synced: bool,
    pub last_sync_error: Option<String>,
    pub table_name: String,
}

impl Dataset {
    pub fn table_name_for(file_id: i64) -> String {
        format!("ds_{}", file_id)
    }
}
