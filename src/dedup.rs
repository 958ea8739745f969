// src/dedup.rs
//! Durable record of already-announced notification ids.
//!
//! Backed by a single SQLite file so announcements survive process restarts.
//! The table is append-only: rows are inserted at announcement time and
//! never updated or deleted.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use thiserror::Error;

use crate::merge::Notification;

const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS seen_notifications (
    id          INTEGER PRIMARY KEY,
    type_id     INTEGER NOT NULL,
    sent_date   TEXT NOT NULL,
    sender_id   INTEGER NOT NULL,
    recorded_at TEXT NOT NULL    -- ISO 8601 UTC, when we announced it
);
";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dedup store error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
}

/// Minimal metadata persisted per announced notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRecord {
    pub id: u64,
    pub type_id: u32,
    pub sent_date: String,
    pub sender_id: u64,
}

impl From<&Notification> for SeenRecord {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            type_id: n.kind.type_id(),
            sent_date: n.sent_date.clone(),
            sender_id: n.sender_id,
        }
    }
}

/// SQLite-backed dedup set. Cloning is cheap — the inner connection is
/// reference-counted. Single-writer use is assumed (one cycle in flight).
#[derive(Clone)]
pub struct SeenStore {
    conn: tokio_rusqlite::Connection,
}

impl SeenStore {
    /// Open (or create) a store at `path` and run schema initialisation.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = tokio_rusqlite::Connection::open(path).await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory store — useful for testing.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// True iff this id has never been announced.
    pub async fn is_new(&self, id: u64) -> Result<bool, StoreError> {
        let seen: bool = self
            .conn
            .call(move |conn| {
                let hit: Option<i64> = conn
                    .query_row(
                        "SELECT 1 FROM seen_notifications WHERE id = ?1",
                        [id as i64],
                        |r| r.get(0),
                    )
                    .optional()?;
                Ok(hit.is_some())
            })
            .await?;
        Ok(!seen)
    }

    /// Record an announcement. Idempotent: re-recording a known id is a
    /// no-op (`INSERT OR IGNORE`), never an error.
    pub async fn record_seen(&self, record: SeenRecord) -> Result<(), StoreError> {
        let recorded_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO seen_notifications
                     (id, type_id, sent_date, sender_id, recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        record.id as i64,
                        record.type_id,
                        record.sent_date,
                        record.sender_id as i64,
                        recorded_at,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
