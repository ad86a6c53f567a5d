//! Database connection client: opens a libSQL/Turso link (local file, local
//! in-memory, or remote) and applies the dataset-metadata schema once at
//! startup.
//!
//! In-memory mode needs one long-lived "anchor" connection held open for
//! the life of the client — libSQL's `:memory:` databases are per-connection
//! otherwise, so every other connection opened from the same `Database`
//! handle would see an empty schema.

use crate::errors::DbError;
use crate::schema::apply_schema;
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use tracing::{error, info, instrument};

#[derive(Clone)]
pub struct DatabaseClient {
    driver: Arc<Database>,
    _memory_anchor: Option<Arc<Connection>>,
}

impl DatabaseClient {
    #[instrument(skip(access_token))]
    pub async fn connect(connection_url: &str, access_token: Option<String>) -> Result<Self, DbError> {
        if connection_url.is_empty() {
            return Err(DbError::ConfigurationError("DATABASE_URL is not set".into()));
        }

        info!(url = connection_url, "opening database connection");

        let is_remote = connection_url.starts_with("libsql://") || connection_url.starts_with("https://");
        let is_memory = connection_url.contains(":memory:") || connection_url.contains("mode=memory");

        let driver = if is_remote {
            let token = access_token
                .ok_or_else(|| DbError::ConfigurationError("remote database requires an access token".into()))?;
            Builder::new_remote(connection_url.to_string(), token).build().await
        } else {
            Builder::new_local(connection_url).build().await
        }
        .map_err(|e| DbError::ConnectionError(e.to_string()))?;

        let driver = Arc::new(driver);
        let mut anchor = None;

        if is_memory {
            let anchor_conn = driver.connect().map_err(|e| DbError::ConnectionError(e.to_string()))?;
            apply_schema(&anchor_conn).await.map_err(|e| DbError::ConnectionError(e.to_string()))?;
            anchor = Some(Arc::new(anchor_conn));
            info!("in-memory database anchored");
        } else {
            let bootstrap = driver.connect().map_err(|e| DbError::ConnectionError(e.to_string()))?;
            apply_schema(&bootstrap).await.map_err(|e| DbError::ConnectionError(e.to_string()))?;
        }

        Ok(Self { driver, _memory_anchor: anchor })
    }

    pub fn get_connection(&self) -> Result<Connection, DbError> {
        self.driver.connect().map_err(|e| {
            error!(error = %e, "failed to allocate a connection");
            DbError::ConnectionError(e.to_string())
        })
    }
}
