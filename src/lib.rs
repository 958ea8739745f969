// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod dedup;
pub mod directory;
pub mod feed;
pub mod merge;
pub mod pipeline;
pub mod render;
pub mod scheduler;
pub mod sde;

// Delivery collaborator (room webhook)
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::merge::{Notification, NotificationKind};
pub use crate::notify::RoomNotifier;
pub use crate::pipeline::{Pipeline, PipelineError, Stage};
