//! Runtime configuration (spec.md §6 "Environment").
//!
//! The teacher reads each tunable ad hoc at the point it's needed; this
//! service centralizes them into one struct read once at startup, since
//! the spec names substantially more tunables (cache TTLs, massive-file
//! threshold, search-index credentials, JWT secret) than the teacher's
//! original config surface.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub database_auth_token: Option<String>,
    pub listening_port: u16,
    pub jwt_secret: String,
    pub search_index_endpoint: Option<String>,
    pub search_index_api_key: Option<String>,
    pub upload_temp_dir: String,
    pub upload_session_max_age_minutes: i64,
    pub cache_max_capacity: u64,
}

impl Settings {
    /// Reads every tunable from the environment, defaulting exactly the way
    /// the teacher's `main.rs`/`kernel.rs` default theirs:
    /// `std::env::var(...).unwrap_or_else(...)`.
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL")
            .expect("CRITICAL_FAULT: DATABASE_URL not defined in runtime environment.");
        let database_auth_token = env::var("TURSO_AUTH_TOKEN").ok();
        let listening_port: u16 =
            env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string());
        let search_index_endpoint = env::var("SEARCH_INDEX_ENDPOINT").ok();
        let search_index_api_key = env::var("SEARCH_INDEX_API_KEY").ok();
        let upload_temp_dir = env::var("UPLOAD_TEMP_DIR").unwrap_or_else(|_| "/tmp/catalog-uploads".to_string());
        let upload_session_max_age_minutes: i64 = env::var("UPLOAD_SESSION_MAX_AGE_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        let cache_max_capacity: u64 =
            env::var("CACHE_MAX_CAPACITY").ok().and_then(|v| v.parse().ok()).unwrap_or(10_000);

        Self {
            database_url,
            database_auth_token,
            listening_port,
            jwt_secret,
            search_index_endpoint,
            search_index_api_key,
            upload_temp_dir,
            upload_session_max_age_minutes,
            cache_max_capacity,
        }
    }
}

/// Per-subscriber disconnect timeout for the progress channel (spec.md
/// §4.11).
pub const PROGRESS_SUBSCRIBER_TIMEOUT: Duration = Duration::from_secs(5);
/// Batch cadence for `batch_progress` publication (spec.md §4.12 step 3).
pub const PROGRESS_PUBLISH_EVERY_N_BATCHES: u64 = 5;
/// Cap on warm-up candidates (spec.md §4.12 step 5).
pub const CACHE_WARMUP_TOP_N: usize = 100;
