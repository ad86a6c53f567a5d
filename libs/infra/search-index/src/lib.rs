//! External search-index client (component G1) and dataset-to-index sync
//! (component F).
//!
//! Grounded on the teacher's `BitcoinNetworkUplinkClient` shape (a
//! `reqwest::Client` built once with an industrial timeout, one method per
//! remote call, a `thiserror` enum at the boundary) and on spec.md §4.6/§4.7
//! for the sync/search contracts themselves.

mod client;
mod sync;

pub use client::{ExternalIndexBackend, IndexClientError};
pub use sync::{sync_file, IndexSyncError, SyncableRow};
