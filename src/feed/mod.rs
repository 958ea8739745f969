// src/feed/mod.rs
//! Client for the notification feed: the two-stage fetch against the EVE
//! XML API (header index first, then bodies by id).

pub mod body;
pub mod types;

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;

use crate::config::ApiSettings;
use types::NotificationHeader;

pub const DEFAULT_BASE_URL: &str = "https://api.eveonline.com";

/// Talking to the feed or directory endpoints failed. The cycle fails
/// wholesale; retry is the scheduler's problem, not ours.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("source returned unparsable xml: {0}")]
    Parse(#[from] quick_xml::DeError),
    #[error("source returned unparsable body text: {0}")]
    Body(#[from] serde_yaml::Error),
    #[error("source rejected request: {code} {message}")]
    Api { code: u16, message: String },
}

/// The two sequential data fetches of one poll cycle. `fetch_bodies` must
/// only be handed ids obtained from `fetch_headers` in the same cycle.
#[async_trait]
pub trait NotificationFeed: Send + Sync {
    async fn fetch_headers(&self) -> Result<Vec<NotificationHeader>, SourceError>;

    /// Batched body fetch. An empty id set is legal and returns an empty
    /// mapping without touching the network.
    async fn fetch_bodies(&self, ids: &BTreeSet<u64>) -> Result<HashMap<u64, Value>, SourceError>;
}

/// HTTP implementation over the XML API, authenticated with a keyID/vCode
/// credential pair (plus an optional characterID selector for multi-character
/// keys).
pub struct XmlApiFeed {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    vcode: String,
    character_id: Option<u64>,
}

impl XmlApiFeed {
    pub fn new(client: reqwest::Client, api: &ApiSettings) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            key_id: api.key_id.clone(),
            vcode: api.vcode.clone(),
            character_id: api.character_id,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("keyID", self.key_id.clone()),
            ("vCode", self.vcode.clone()),
        ];
        if let Some(id) = self.character_id {
            params.push(("characterID", id.to_string()));
        }
        params
    }

    async fn get_rowset<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<Vec<T>, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        let xml = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        tracing::debug!(target: "feed", path, bytes = xml.len(), "feed response");
        parse_rowset(&xml)
    }
}

#[async_trait]
impl NotificationFeed for XmlApiFeed {
    async fn fetch_headers(&self) -> Result<Vec<NotificationHeader>, SourceError> {
        self.get_rowset("/char/Notifications.xml.aspx", &self.params())
            .await
    }

    async fn fetch_bodies(&self, ids: &BTreeSet<u64>) -> Result<HashMap<u64, Value>, SourceError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut params = self.params();
        params.push(("IDs", join_ids(ids)));
        let rows: Vec<TextRow> = self
            .get_rowset("/char/NotificationTexts.xml.aspx", &params)
            .await?;
        collect_bodies(rows)
    }
}

pub(crate) fn join_ids<I: std::fmt::Display, T: IntoIterator<Item = I>>(ids: T) -> String {
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

// ---- XML rowset shape ----
//
// <eveapi version="2">
//   <result><rowset name="..."><row .../></rowset></result>
//   <cachedUntil>...</cachedUntil>
// </eveapi>
//
// Error responses replace <result> with <error code="...">message</error>.

#[derive(Debug, Deserialize)]
struct ApiDoc<T> {
    result: Option<ResultBody<T>>,
    error: Option<ApiFault>,
}

#[derive(Debug, Deserialize)]
struct ResultBody<T> {
    rowset: Rowset<T>,
}

#[derive(Debug, Deserialize)]
struct Rowset<T> {
    #[serde(rename = "row", default = "Vec::new")]
    rows: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiFault {
    #[serde(rename = "@code")]
    code: u16,
    #[serde(rename = "$text")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct TextRow {
    #[serde(rename = "@notificationID")]
    id: u64,
    #[serde(rename = "$text", default)]
    text: Option<String>,
}

pub(crate) fn parse_rowset<T: for<'de> Deserialize<'de>>(xml: &str) -> Result<Vec<T>, SourceError> {
    let doc: ApiDoc<T> = quick_xml::de::from_str(xml)?;
    if let Some(fault) = doc.error {
        return Err(SourceError::Api {
            code: fault.code,
            message: fault.message.trim().to_string(),
        });
    }
    doc.result
        .map(|r| r.rowset.rows)
        .ok_or_else(|| SourceError::Api {
            code: 0,
            message: "response carried neither result nor error".to_string(),
        })
}

fn collect_bodies(rows: Vec<TextRow>) -> Result<HashMap<u64, Value>, SourceError> {
    let mut bodies = HashMap::with_capacity(rows.len());
    for row in rows {
        let Some(text) = row.text else {
            tracing::info!(target: "feed", id = row.id, "body row without text, skipping");
            continue;
        };
        let value: Value = serde_yaml::from_str(&text)?;
        bodies.insert(row.id, value);
    }
    Ok(bodies)
}
