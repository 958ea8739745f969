// src/config.rs
//! Process configuration: TOML file with an env-var path override.
//!
//! Search order: $SOV_HERALD_CONFIG, then config/sov-herald.toml.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::merge::NotificationKind;

const ENV_PATH: &str = "SOV_HERALD_CONFIG";
const DEFAULT_PATH: &str = "config/sov-herald.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    pub room: RoomSettings,
    #[serde(default)]
    pub poll: PollSettings,
    #[serde(default)]
    pub store: StoreSettings,
    /// Feed typeIDs to announce. Empty means every supported kind.
    #[serde(default)]
    pub selected_types: Vec<u32>,
}

/// Credential pair for the feed, plus the sub-identity selector needed when
/// the key covers multiple characters.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub key_id: String,
    pub vcode: String,
    #[serde(default)]
    pub character_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomSettings {
    pub webhook_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_seen_db")]
    pub seen_db: PathBuf,
    #[serde(default = "default_sde_db")]
    pub sde_db: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            seen_db: default_seen_db(),
            sde_db: default_sde_db(),
        }
    }
}

fn default_interval_secs() -> u64 {
    1800 // 30 minutes
}

fn default_seen_db() -> PathBuf {
    PathBuf::from("sov-herald.sqlite")
}

fn default_sde_db() -> PathBuf {
    PathBuf::from("sqlite-latest.sqlite")
}

impl Settings {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("parsing settings from {}", path.display()))?;
        Ok(settings)
    }

    /// Load using env var + fallback path.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
        Self::load_from(Path::new(DEFAULT_PATH))
    }

    /// The configured kind set. Unknown typeIDs are ignored with a warning;
    /// an empty selection means all supported kinds.
    pub fn supported_kinds(&self) -> HashSet<NotificationKind> {
        if self.selected_types.is_empty() {
            return NotificationKind::ALL.into_iter().collect();
        }
        let mut kinds = HashSet::new();
        for type_id in &self.selected_types {
            match NotificationKind::from_type_id(*type_id) {
                Some(kind) => {
                    kinds.insert(kind);
                }
                None => {
                    tracing::warn!(type_id, "selected_types entry is not a supported kind");
                }
            }
        }
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [api]
        key_id = "1234567"
        vcode = "abcdef"

        [room]
        webhook_url = "https://chat.example/hooks/sov"
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let s: Settings = toml::from_str(MINIMAL).unwrap();
        assert_eq!(s.poll.interval_secs, 1800);
        assert_eq!(s.store.seen_db, PathBuf::from("sov-herald.sqlite"));
        assert_eq!(s.api.character_id, None);
        assert_eq!(s.supported_kinds().len(), NotificationKind::ALL.len());
    }

    #[test]
    fn selected_types_filter_supported_kinds() {
        // Top-level keys must precede the tables.
        let src = format!("selected_types = [38, 45, 16]\n{MINIMAL}");
        let s: Settings = toml::from_str(&src).unwrap();
        let kinds = s.supported_kinds();
        assert_eq!(kinds.len(), 2);
        assert!(kinds.contains(&NotificationKind::SovClaimFailed));
        assert!(kinds.contains(&NotificationKind::TowerAnchored));
    }
}
