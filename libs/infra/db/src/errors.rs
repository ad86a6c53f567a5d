//! Catalog of persistence-layer failures.
//!
//! Kept in the teacher's bracketed-tag style (`[L3_...]`) so log lines stay
//! greppable by stratum; the tags themselves are renamed for the dataset
//! domain rather than the mission/identity domain they replace.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    #[error("[L3_DB_CONFIG_FAULT]: ENVIRONMENT_VOID -> {0}")]
    ConfigurationError(String),

    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    #[error("[L3_DATASET_FAULT]: DATASET_NOT_FOUND")]
    DatasetNotFound,

    #[error("[L3_DATASET_FAULT]: INVALID_STATE_TRANSITION from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE")]
    TransactionError,
}
