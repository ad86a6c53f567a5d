//! Background services: the progress bus (component K), the ingestion
//! orchestrator (component L), and the upload-session reaper.

pub mod event_bus;
pub mod orchestrator;
pub mod reaper;

pub use event_bus::EventBus;
pub use reaper::spawn_reaper;
