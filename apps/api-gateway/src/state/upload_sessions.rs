//! Chunked-upload session registry (component I).
//!
//! Grounded on the original pipeline's `_multipart_sessions` /
//! `_multipart_sessions_lock`: a single mutex guarding a node-local map,
//! every mutating operation holding the lock only for the map update
//! (spec.md §5's "file I/O happens outside" rule). Replaces the teacher's
//! `mission_control.rs` FIFO dispatch queue, which has no spec counterpart.

use catalog_domain_models::upload::UploadSessionState;
use catalog_domain_models::UploadSession;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

pub struct UploadSessionRegistry {
    sessions: Mutex<HashMap<String, UploadSession>>,
}

impl UploadSessionRegistry {
    pub fn new() -> Self {
        Self { sessions: Mutex::new(HashMap::new()) }
    }

    pub fn init(&self, file_id: i64, temp_path: String, filename: String, content_type: String) -> UploadSession {
        let session = UploadSession {
            upload_id: Uuid::new_v4().to_string(),
            file_id,
            temp_path,
            filename,
            content_type,
            received_bytes: 0,
            declared_total: None,
            created_at: Utc::now(),
            state: UploadSessionState::Receiving,
        };
        self.sessions.lock().expect("upload session registry poisoned").insert(session.upload_id.clone(), session.clone());
        session
    }

    pub fn get(&self, upload_id: &str) -> Option<UploadSession> {
        self.sessions.lock().expect("upload session registry poisoned").get(upload_id).cloned()
    }

    pub fn record_bytes_received(&self, upload_id: &str, additional_bytes: u64) -> Option<UploadSession> {
        let mut guard = self.sessions.lock().expect("upload session registry poisoned");
        let session = guard.get_mut(upload_id)?;
        session.received_bytes += additional_bytes;
        Some(session.clone())
    }

    pub fn mark_completing(&self, upload_id: &str) -> Option<UploadSession> {
        let mut guard = self.sessions.lock().expect("upload session registry poisoned");
        let session = guard.get_mut(upload_id)?;
        session.state = UploadSessionState::Completing;
        Some(session.clone())
    }

    /// Removes the session from the registry, returning it so the caller
    /// can schedule the temp file for deferred cleanup (spec.md §4.9's
    /// grace-period rule).
    pub fn remove(&self, upload_id: &str) -> Option<UploadSession> {
        self.sessions.lock().expect("upload session registry poisoned").remove(upload_id)
    }

    /// Sweeps sessions older than `max_age_minutes`, returning their temp
    /// paths for deletion by the reaper (spec.md §4.9's expiry rule).
    pub fn sweep_expired(&self, max_age_minutes: i64) -> Vec<UploadSession> {
        let now = Utc::now();
        let mut guard = self.sessions.lock().expect("upload session registry poisoned");
        let expired_ids: Vec<String> = guard
            .iter()
            .filter(|(_, session)| session.is_expired(now, max_age_minutes))
            .map(|(id, _)| id.clone())
            .collect();
        expired_ids.iter().filter_map(|id| guard.remove(id)).collect()
    }
}

impl Default for UploadSessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
