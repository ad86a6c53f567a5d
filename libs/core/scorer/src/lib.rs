//! Confidence scoring (component B) and the unified multi-backend search
//! engine's fallback/chunk/dedup/rerank orchestration (component H).
//!
//! H lives next to B rather than in its own crate because it owns no
//! state beyond the backend trait objects it is handed at construction
//! time: it is pure orchestration over whatever implements [`SearchBackend`],
//! and its reranking reuses B's confidence tiers directly.

pub mod backend;
pub mod confidence;
pub mod engine;

pub use backend::{BackendError, SearchBackend};
pub use confidence::{calculate_confidence, ConfidenceResult};
pub use engine::{dedup_and_rank, paginate, relevance_score, UnifiedSearchEngine, MAX_SHOW_ALL_MATCHES};
