pub mod webhook;

pub use webhook::WebhookNotifier;

use anyhow::Result;
use async_trait::async_trait;

/// Delivery transport for rendered announcements: one post per message, in
/// order. The pipeline itself never talks to the room.
#[async_trait]
pub trait RoomNotifier: Send + Sync {
    async fn post(&self, message: &str) -> Result<()>;
}
