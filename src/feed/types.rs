// src/feed/types.rs
use serde::Deserialize;

/// One entry from the notification index listing. Lives for a single poll
/// cycle only; nothing here is persisted.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NotificationHeader {
    #[serde(rename = "@notificationID")]
    pub id: u64,
    #[serde(rename = "@typeID")]
    pub type_id: u32,
    #[serde(rename = "@senderID")]
    pub sender_id: u64,
    #[serde(rename = "@sentDate")]
    pub sent_date: String,
    #[serde(rename = "@senderName", default)]
    pub sender_name: Option<String>,
    #[serde(rename = "@read", default)]
    pub read: bool,
}
