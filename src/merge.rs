// src/merge.rs
//! Merging header and body records into typed notifications.
//!
//! The feed reports notifications in two stages; only ids present in both
//! stages (and whose kind we actually announce) become a [`Notification`].

use std::collections::{HashMap, HashSet};

use serde_yaml::Value;

use crate::feed::types::NotificationHeader;

/// The closed set of notification kinds this bot knows how to announce.
///
/// Anything the feed invents beyond these is filtered out before merge, so
/// the renderer can match exhaustively and no "unregistered kind" failure
/// mode exists at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    SovClaimFailed,
    SovBillLate,
    SovClaimLost,
    SovClaimAcquired,
    TowerAnchored,
    StructureVulnerable,
    StructureInvulnerable,
    SovDisruptorAnchored,
    StructureWonLost,
    TowerAlert,
    TowerResourceAlert,
    StationServiceAggression,
    StationStateChange,
    StationConquered,
    StationAggression,
    TcuUnderAttack,
    SbuUnderAttack,
    IhubUnderAttack,
    CustomsOfficeAttacked,
    CustomsOfficeReinforced,
    CustomsOfficeTransferred,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 21] = [
        NotificationKind::SovClaimFailed,
        NotificationKind::SovBillLate,
        NotificationKind::SovClaimLost,
        NotificationKind::SovClaimAcquired,
        NotificationKind::TowerAnchored,
        NotificationKind::StructureVulnerable,
        NotificationKind::StructureInvulnerable,
        NotificationKind::SovDisruptorAnchored,
        NotificationKind::StructureWonLost,
        NotificationKind::TowerAlert,
        NotificationKind::TowerResourceAlert,
        NotificationKind::StationServiceAggression,
        NotificationKind::StationStateChange,
        NotificationKind::StationConquered,
        NotificationKind::StationAggression,
        NotificationKind::TcuUnderAttack,
        NotificationKind::SbuUnderAttack,
        NotificationKind::IhubUnderAttack,
        NotificationKind::CustomsOfficeAttacked,
        NotificationKind::CustomsOfficeReinforced,
        NotificationKind::CustomsOfficeTransferred,
    ];

    /// Map a feed typeID to a kind, or `None` for anything we don't announce.
    pub fn from_type_id(type_id: u32) -> Option<Self> {
        let kind = match type_id {
            38 => NotificationKind::SovClaimFailed,
            40 => NotificationKind::SovBillLate,
            42 => NotificationKind::SovClaimLost,
            44 => NotificationKind::SovClaimAcquired,
            45 => NotificationKind::TowerAnchored,
            46 => NotificationKind::StructureVulnerable,
            47 => NotificationKind::StructureInvulnerable,
            48 => NotificationKind::SovDisruptorAnchored,
            49 => NotificationKind::StructureWonLost,
            75 => NotificationKind::TowerAlert,
            76 => NotificationKind::TowerResourceAlert,
            77 => NotificationKind::StationServiceAggression,
            78 => NotificationKind::StationStateChange,
            79 => NotificationKind::StationConquered,
            80 => NotificationKind::StationAggression,
            86 => NotificationKind::TcuUnderAttack,
            87 => NotificationKind::SbuUnderAttack,
            88 => NotificationKind::IhubUnderAttack,
            93 => NotificationKind::CustomsOfficeAttacked,
            94 => NotificationKind::CustomsOfficeReinforced,
            95 => NotificationKind::CustomsOfficeTransferred,
            _ => return None,
        };
        Some(kind)
    }

    pub fn type_id(self) -> u32 {
        match self {
            NotificationKind::SovClaimFailed => 38,
            NotificationKind::SovBillLate => 40,
            NotificationKind::SovClaimLost => 42,
            NotificationKind::SovClaimAcquired => 44,
            NotificationKind::TowerAnchored => 45,
            NotificationKind::StructureVulnerable => 46,
            NotificationKind::StructureInvulnerable => 47,
            NotificationKind::SovDisruptorAnchored => 48,
            NotificationKind::StructureWonLost => 49,
            NotificationKind::TowerAlert => 75,
            NotificationKind::TowerResourceAlert => 76,
            NotificationKind::StationServiceAggression => 77,
            NotificationKind::StationStateChange => 78,
            NotificationKind::StationConquered => 79,
            NotificationKind::StationAggression => 80,
            NotificationKind::TcuUnderAttack => 86,
            NotificationKind::SbuUnderAttack => 87,
            NotificationKind::IhubUnderAttack => 88,
            NotificationKind::CustomsOfficeAttacked => 93,
            NotificationKind::CustomsOfficeReinforced => 94,
            NotificationKind::CustomsOfficeTransferred => 95,
        }
    }

    /// Short human label, used in logs and in the degraded rendering path.
    pub fn describe(self) -> &'static str {
        match self {
            NotificationKind::SovClaimFailed => "Sovereignty claim failed",
            NotificationKind::SovBillLate => "Sovereignty bill late",
            NotificationKind::SovClaimLost => "Sovereignty claim lost",
            NotificationKind::SovClaimAcquired => "Sovereignty claim acquired",
            NotificationKind::TowerAnchored => "Alliance anchoring alert",
            NotificationKind::StructureVulnerable => "Alliance structure vulnerable",
            NotificationKind::StructureInvulnerable => "Alliance structure invulnerable",
            NotificationKind::SovDisruptorAnchored => "Sovereignty disruptor anchored",
            NotificationKind::StructureWonLost => "Structure won/lost",
            NotificationKind::TowerAlert => "Tower alert",
            NotificationKind::TowerResourceAlert => "Tower resource alert",
            NotificationKind::StationServiceAggression => "Station service aggression",
            NotificationKind::StationStateChange => "Station state change message",
            NotificationKind::StationConquered => "Station conquered",
            NotificationKind::StationAggression => "Station aggression",
            NotificationKind::TcuUnderAttack => "TCU under attack",
            NotificationKind::SbuUnderAttack => "SBU under attack",
            NotificationKind::IhubUnderAttack => "IHUB under attack",
            NotificationKind::CustomsOfficeAttacked => "Customs office attacked",
            NotificationKind::CustomsOfficeReinforced => "Customs office reinforced",
            NotificationKind::CustomsOfficeTransferred => "Customs office transferred",
        }
    }
}

/// A fully merged notification: header metadata plus the body document.
///
/// Exists only if both stages of the fetch reported the same id; the
/// renderer never sees a bodyless notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub sent_date: String,
    pub sender_id: u64,
    pub sender_name: Option<String>,
    pub body: Value,
}

/// Combine headers and bodies into notifications, preserving header order.
///
/// Headers of unsupported kinds are skipped without looking at their body.
/// A supported header with no matching body is dropped with an info log —
/// the two feed requests can race upstream, so this is not an error.
pub fn merge(
    headers: Vec<NotificationHeader>,
    mut bodies: HashMap<u64, Value>,
    supported: &HashSet<NotificationKind>,
) -> Vec<Notification> {
    let mut out = Vec::with_capacity(headers.len());
    for header in headers {
        let Some(kind) = NotificationKind::from_type_id(header.type_id) else {
            continue;
        };
        if !supported.contains(&kind) {
            continue;
        }
        let Some(body) = bodies.remove(&header.id) else {
            tracing::info!(
                id = header.id,
                type_id = header.type_id,
                "header without matching body, dropped"
            );
            continue;
        };
        out.push(Notification {
            id: header.id,
            kind,
            sent_date: header.sent_date,
            sender_id: header.sender_id,
            sender_name: header.sender_name,
            body,
        });
    }
    out
}
