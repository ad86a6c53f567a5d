//! Shared domain types for the part-catalog ingestion and search service.
//!
//! These are the Single Source of Truth DTOs/entities threaded between the
//! parser, ingester, search backends and HTTP layer. Nothing here touches
//! I/O; it is pure data plus the small amount of derivation logic that is
//! genuinely type-level (e.g. status enums).

pub mod dataset;
pub mod search;
pub mod progress;
pub mod upload;
pub mod user;

pub use dataset::{Dataset, DatasetRow, DatasetStatus};
pub use progress::ProgressMessage;
pub use search::{
    CompanyMatch, ConfidenceBreakdown, MatchStatus, MatchType, PriceSummary, SearchMode,
    SearchResult,
};
pub use upload::UploadSession;
pub use user::User;
