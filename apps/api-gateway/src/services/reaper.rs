//! Upload-session expiry sweep (spec.md §4.9): sessions older than the
//! configured max age are removed from the registry and their temp files
//! deleted. Kept in the teacher's perpetual-interval daemon shape.

use crate::state::AppState;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub async fn spawn_reaper(application_state: AppState) {
    let mut ticker = interval(SWEEP_INTERVAL);

    tokio::spawn(async move {
        info!("upload-session reaper started");

        loop {
            ticker.tick().await;

            let max_age = application_state.settings.upload_session_max_age_minutes;
            let expired = application_state.upload_sessions.sweep_expired(max_age);

            if expired.is_empty() {
                continue;
            }

            for session in &expired {
                if let Err(error) = tokio::fs::remove_file(&session.temp_path).await {
                    warn!(upload_id = %session.upload_id, path = %session.temp_path, error = %error, "failed to remove expired upload temp file");
                }
            }

            info!(count = expired.len(), "swept expired upload sessions");
        }
    });
}
