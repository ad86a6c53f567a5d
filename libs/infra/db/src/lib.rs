//! libSQL/Turso persistence adapter: dataset metadata, per-dataset table
//! ingestion (component E), and the relational fuzzy search backend (G2).

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::DatabaseClient;
pub use errors::DbError;
pub use repositories::{DatasetRepository, SearchRepository, UserRepository};
