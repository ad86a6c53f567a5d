//! Repository layer: dataset metadata + per-dataset table ingestion
//! (component E) and the relational fuzzy search backend (component G2).

pub mod dataset_repository;
pub mod search_repository;
pub mod user_repository;

pub use dataset_repository::{DatasetRepository, adaptive_batch_size, MASSIVE_FILE_THRESHOLD_BYTES, STANDARD_BATCH_SIZE, STREAMING_BATCH_SIZE};
pub use search_repository::SearchRepository;
pub use user_repository::UserRepository;
