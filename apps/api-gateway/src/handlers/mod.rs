//! HTTP and WebSocket adapters.

pub mod auth;
pub mod bulk_search;
pub mod health;
pub mod query;
pub mod stream;
pub mod sync;
pub mod upload;
