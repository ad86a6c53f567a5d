//! Progress channel message kinds (spec.md §4.11).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressMessage {
    ProcessingStarted {
        file_id: i64,
    },
    BatchProgress {
        file_id: i64,
        processed_rows: i64,
        current_batch: u64,
        dropped_rows: i64,
    },
    IndexSyncProgress {
        file_id: i64,
        synced_rows: i64,
    },
    ProcessingComplete {
        file_id: i64,
        total_rows: i64,
        index_synced: bool,
        dropped_rows: i64,
    },
    Error {
        file_id: i64,
        reason: String,
    },
}

impl ProgressMessage {
    pub fn file_id(&self) -> i64 {
        match self {
            ProgressMessage::ProcessingStarted { file_id }
            | ProgressMessage::BatchProgress { file_id, .. }
            | ProgressMessage::IndexSyncProgress { file_id, .. }
            | ProgressMessage::ProcessingComplete { file_id, .. }
            | ProgressMessage::Error { file_id, .. } => *file_id,
        }
    }
}
