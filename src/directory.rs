// src/directory.rs
//! Resolving actor ids (characters, corporations, alliances) referenced by
//! notification bodies into display names.
//!
//! Names are resolved fresh every cycle with exactly one batched lookup;
//! they are never cached across cycles because upstream names can change.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde::Deserialize;

use crate::feed::{self, SourceError};
use crate::merge::Notification;

/// Body fields that may carry an actor id worth resolving.
const ACTOR_ID_FIELDS: [&str; 5] = [
    "aggressorID",
    "aggressorCorpID",
    "aggressorAllianceID",
    "corpID",
    "allianceID",
];

/// The union of actor ids referenced by all notifications of one cycle.
///
/// Null, zero, and non-scalar values are excluded; some kinds reuse
/// `aggressorAllianceID` as a nested mapping of defense values, which is not
/// an id at all.
pub fn collect_actor_ids(notifications: &[Notification]) -> BTreeSet<i64> {
    let mut ids = BTreeSet::new();
    for n in notifications {
        for field in ACTOR_ID_FIELDS {
            if let Some(id) = feed::body::field_i64(&n.body, field) {
                if id > 0 {
                    ids.insert(id);
                }
            }
        }
    }
    ids
}

/// Batched id→name lookup against the directory endpoint.
#[async_trait]
pub trait NameDirectory: Send + Sync {
    async fn resolve(&self, ids: &BTreeSet<i64>) -> Result<HashMap<i64, String>, SourceError>;
}

/// Per-cycle id→name mapping handed to the renderer. Misses degrade to a
/// placeholder instead of failing.
#[derive(Debug, Default)]
pub struct Directory {
    names: HashMap<i64, String>,
}

impl Directory {
    pub fn new(names: HashMap<i64, String>) -> Self {
        Self { names }
    }

    pub fn name(&self, id: i64) -> &str {
        self.names.get(&id).map(String::as_str).unwrap_or("unknown")
    }
}

/// HTTP implementation over the CharacterName endpoint. The endpoint takes a
/// comma-joined id list and needs no credentials.
pub struct XmlApiDirectory {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NameRow {
    #[serde(rename = "@characterID")]
    id: i64,
    #[serde(rename = "@name")]
    name: String,
}

impl XmlApiDirectory {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: feed::DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl NameDirectory for XmlApiDirectory {
    async fn resolve(&self, ids: &BTreeSet<i64>) -> Result<HashMap<i64, String>, SourceError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let url = format!("{}/eve/CharacterName.xml.aspx", self.base_url);
        let xml = self
            .client
            .get(&url)
            .query(&[("IDs", feed::join_ids(ids))])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let rows: Vec<NameRow> = feed::parse_rowset(&xml)?;
        Ok(rows.into_iter().map(|r| (r.id, r.name)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::NotificationKind;

    fn notification(body_src: &str) -> Notification {
        Notification {
            id: 1,
            kind: NotificationKind::TowerAlert,
            sent_date: "2014-05-01 10:08:00".to_string(),
            sender_id: 1000,
            sender_name: None,
            body: serde_yaml::from_str(body_src).unwrap(),
        }
    }

    #[test]
    fn collects_scalar_positive_ids_only() {
        let n = notification(
            "aggressorID: 91000001\n\
             aggressorCorpID: 0\n\
             corpID: ~\n\
             allianceID: 99000001\n\
             aggressorAllianceID:\n  shieldValue: 0.5\n",
        );
        let ids = collect_actor_ids(&[n]);
        assert_eq!(ids, [91000001, 99000001].into_iter().collect());
    }

    #[test]
    fn union_across_notifications_dedups() {
        let a = notification("corpID: 200\nallianceID: 100\n");
        let b = notification("corpID: 200\naggressorID: 300\n");
        let ids = collect_actor_ids(&[a, b]);
        assert_eq!(ids, [100, 200, 300].into_iter().collect());
    }

    #[test]
    fn directory_miss_degrades_to_unknown() {
        let dir = Directory::new([(100i64, "Alpha".to_string())].into_iter().collect());
        assert_eq!(dir.name(100), "Alpha");
        assert_eq!(dir.name(999), "unknown");
    }
}
