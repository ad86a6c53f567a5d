//! Chunked upload session state (spec.md §4.9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadSessionState {
    Init,
    Receiving,
    Completing,
    Done,
}

/// One in-progress chunked upload, node-local (spec.md §4.9, §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub upload_id: String,
    pub file_id: i64,
    pub temp_path: String,
    pub filename: String,
    pub content_type: String,
    pub received_bytes: u64,
    pub declared_total: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub state: UploadSessionState,
}

impl UploadSession {
    pub fn is_expired(&self, now: DateTime<Utc>, max_age_minutes: i64) -> bool {
        now.signed_duration_since(self.created_at) > chrono::Duration::minutes(max_age_minutes)
    }
}
