// src/render.rs
//! Turning merged notifications into chat-ready message strings.
//!
//! One formatting rule per [`NotificationKind`], dispatched by an exhaustive
//! match, so a kind that reaches the renderer always has a rule. Every rule
//! prefixes the bracketed sent timestamp. Rules that need fields the body
//! doesn't have fall back to the generic timestamp-plus-body-dump rendering
//! instead of failing; reference-data misses substitute sentinel strings.

use serde_yaml::Value;

use crate::directory::Directory;
use crate::feed::body;
use crate::merge::{Notification, NotificationKind};
use crate::sde::ReferenceData;

pub const UNKNOWN_SYSTEM: &str = "unknown solar system";
pub const UNKNOWN_ITEM: &str = "unknown item";
pub const UNKNOWN_LOCATION: &str = "unknown location";

pub struct Renderer<'a> {
    sde: &'a dyn ReferenceData,
    names: &'a Directory,
}

impl<'a> Renderer<'a> {
    pub fn new(sde: &'a dyn ReferenceData, names: &'a Directory) -> Self {
        Self { sde, names }
    }

    pub fn render(&self, n: &Notification) -> String {
        use NotificationKind::*;
        match n.kind {
            SovClaimFailed => format!(
                "[{}] Sovereignty claim failed in {}.",
                n.sent_date,
                self.system(n)
            ),
            SovBillLate => format!(
                "[{}] Sovereignty bill late for {}.",
                n.sent_date,
                self.system(n)
            ),
            SovClaimLost => format!(
                "[{}] Sovereignty claim lost in {}.",
                n.sent_date,
                self.system(n)
            ),
            SovClaimAcquired => format!(
                "[{}] Sovereignty claim acquired in {}.",
                n.sent_date,
                self.system(n)
            ),
            TowerAnchored => format!(
                "[{}] Control tower anchored in {}: {} [{}] <{}> at {}.",
                n.sent_date,
                self.system(n),
                self.item(n),
                self.actor(n, "allianceID"),
                self.actor(n, "corpID"),
                self.moon(n)
            ),
            StructureVulnerable => format!(
                "[{}] Alliance structure vulnerable: {} in {}.",
                n.sent_date,
                self.item(n),
                self.system(n)
            ),
            StructureInvulnerable => format!(
                "[{}] Alliance structure invulnerable: {} in {}.",
                n.sent_date,
                self.item(n),
                self.system(n)
            ),
            SovDisruptorAnchored => {
                format!("[{}] SBU anchored in {}.", n.sent_date, self.system(n))
            }
            StructureWonLost => format!(
                "[{}] Structure won/lost in {}: {}",
                n.sent_date,
                self.system(n),
                body::dump(&n.body)
            ),
            TowerAlert => self.tower_alert(n).unwrap_or_else(|| self.fallback(n)),
            TowerResourceAlert => self
                .tower_resource_alert(n)
                .unwrap_or_else(|| self.fallback(n)),
            StationServiceAggression => self
                .station_service_aggression(n)
                .unwrap_or_else(|| self.fallback(n)),
            StationStateChange => self.fallback(n),
            StationConquered => format!(
                "[{}] Station conquered in {} by {}.",
                n.sent_date,
                self.system(n),
                self.actor(n, "aggressorID")
            ),
            StationAggression => self
                .station_aggression(n)
                .unwrap_or_else(|| self.fallback(n)),
            TcuUnderAttack => self
                .sov_structure_under_attack(n, "TCU")
                .unwrap_or_else(|| self.fallback(n)),
            SbuUnderAttack => self
                .sov_structure_under_attack(n, "SBU")
                .unwrap_or_else(|| self.fallback(n)),
            IhubUnderAttack => self
                .sov_structure_under_attack(n, "IHUB")
                .unwrap_or_else(|| self.fallback(n)),
            CustomsOfficeAttacked => self.poco_attack(n).unwrap_or_else(|| self.fallback(n)),
            CustomsOfficeReinforced => format!(
                "[{}] POCO has entered reinforced mode at {}.",
                n.sent_date,
                self.planet(n)
            ),
            CustomsOfficeTransferred => self.fallback(n),
        }
    }

    /// Degraded-but-non-failing rendering: timestamp, kind label, raw body.
    fn fallback(&self, n: &Notification) -> String {
        format!(
            "[{}] {}: {}",
            n.sent_date,
            n.kind.describe(),
            body::dump(&n.body)
        )
    }

    // ---- Per-kind narratives that need defensive field extraction ----

    fn tower_alert(&self, n: &Notification) -> Option<String> {
        // Towers anchored at a moon report moonID; wormhole towers don't.
        let location = match body::field_i64(&n.body, "moonID") {
            Some(id) if id > 0 => self.celestial(id),
            _ => self.system(n),
        };
        let (shield, armor, hull) = self.defense_nested(n)?;
        Some(format!(
            "[{}] Tower Alert: {} under attack at {}. Shield: {}%, Armor: {}%, Hull: {}%, Attacker: {} [{}] <{}>",
            n.sent_date,
            self.item(n),
            location,
            shield,
            armor,
            hull,
            self.actor(n, "aggressorID"),
            self.actor(n, "allianceID"),
            self.actor(n, "corpID"),
        ))
    }

    fn tower_resource_alert(&self, n: &Notification) -> Option<String> {
        let wants = body::field(&n.body, "wants")?;
        let quantity = wants
            .as_mapping()
            .and_then(|m| m.get(Value::from("quantity")))
            .and_then(body::value_i64)?;
        let fuel_type = wants
            .as_mapping()
            .and_then(|m| m.get(Value::from("typeID")))
            .and_then(body::value_i64)?;
        Some(format!(
            "[{}] Tower resource alert: {} in {} only has {} {}s remaining.",
            n.sent_date,
            self.item(n),
            self.moon(n),
            quantity,
            self.item_by_id(fuel_type),
        ))
    }

    fn station_service_aggression(&self, n: &Notification) -> Option<String> {
        let shield = pct(body::nested_f64(&n.body, "aggressorAllianceID", "shieldValue")?);
        Some(format!(
            "[{}] {} under attack in {} by {}, shield at {}%.",
            n.sent_date,
            self.item(n),
            self.system(n),
            self.actor(n, "aggressorID"),
            shield,
        ))
    }

    fn station_aggression(&self, n: &Notification) -> Option<String> {
        let (shield, armor, hull) = self.defense_nested(n)?;
        Some(format!(
            "[{}] Station under attack in {}. Shield: {}%, Armor: {}%, Hull: {}%, Attacker: {}.",
            n.sent_date,
            self.system(n),
            shield,
            armor,
            hull,
            self.actor(n, "aggressorID"),
        ))
    }

    fn sov_structure_under_attack(&self, n: &Notification, label: &str) -> Option<String> {
        let (shield, armor, hull) = self.defense_top(n)?;
        Some(format!(
            "[{}] {} under attack in {}. Shield: {}%, Armor: {}%, Hull: {}%, Attacker: {}.",
            n.sent_date,
            label,
            self.system(n),
            shield,
            armor,
            hull,
            self.actor(n, "aggressorID"),
        ))
    }

    fn poco_attack(&self, n: &Notification) -> Option<String> {
        let (shield, armor, hull) = self.defense_nested(n)?;
        Some(format!(
            "[{}] POCO under attack at {}. Shield: {}%, Armor: {}%, Hull: {}%, Attacker: {}.",
            n.sent_date,
            self.planet(n),
            shield,
            armor,
            hull,
            self.actor(n, "aggressorID"),
        ))
    }

    // ---- Lookups with sentinel fallbacks ----

    fn system(&self, n: &Notification) -> String {
        body::field_i64(&n.body, "solarSystemID")
            .and_then(|id| self.sde.solar_system_name(id))
            .unwrap_or_else(|| UNKNOWN_SYSTEM.to_string())
    }

    fn item(&self, n: &Notification) -> String {
        body::field_i64(&n.body, "typeID")
            .map(|id| self.item_by_id(id))
            .unwrap_or_else(|| UNKNOWN_ITEM.to_string())
    }

    fn item_by_id(&self, id: i64) -> String {
        self.sde
            .type_name(id)
            .unwrap_or_else(|| UNKNOWN_ITEM.to_string())
    }

    fn moon(&self, n: &Notification) -> String {
        body::field_i64(&n.body, "moonID")
            .map(|id| self.celestial(id))
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
    }

    fn planet(&self, n: &Notification) -> String {
        body::field_i64(&n.body, "planetID")
            .map(|id| self.celestial(id))
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
    }

    fn celestial(&self, id: i64) -> String {
        self.sde
            .celestial_name(id)
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
    }

    fn actor(&self, n: &Notification, field: &str) -> String {
        match body::field_i64(&n.body, field) {
            Some(id) => self.names.name(id).to_string(),
            None => "unknown".to_string(),
        }
    }

    // Defense metrics arrive as fractions in 0.0..=1.0. Some kinds nest them
    // under the body's `aggressorAllianceID` mapping, others ship them at
    // the top level.

    fn defense_nested(&self, n: &Notification) -> Option<(i64, i64, i64)> {
        Some((
            pct(body::nested_f64(&n.body, "aggressorAllianceID", "shieldValue")?),
            pct(body::nested_f64(&n.body, "aggressorAllianceID", "armorValue")?),
            pct(body::nested_f64(&n.body, "aggressorAllianceID", "hullValue")?),
        ))
    }

    fn defense_top(&self, n: &Notification) -> Option<(i64, i64, i64)> {
        Some((
            pct(body::field(&n.body, "shieldValue").and_then(body::value_f64)?),
            pct(body::field(&n.body, "armorValue").and_then(body::value_f64)?),
            pct(body::field(&n.body, "hullValue").and_then(body::value_f64)?),
        ))
    }
}

/// Fraction to integer percent by truncation, not rounding: 0.567 -> 56.
fn pct(fraction: f64) -> i64 {
    (fraction * 100.0).floor() as i64
}
