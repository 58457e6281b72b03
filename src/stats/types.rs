//! Wire types for the exporter's `stats.json` document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Produced/consumed/stored counters for one science pack at one quality.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SciencePackStats {
    pub produced: f64,
    pub consumed: f64,
    pub stored: f64,
}

/// Science data keyed by `<pack-type>_<quality>`.
pub type ScienceData = BTreeMap<String, SciencePackStats>;

/// Cumulative totals and trailing one-minute rates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SciencePacks {
    pub total: ScienceData,
    pub rate_1m: ScienceData,
}

/// An entry in the research queue.
///
/// Only the item at position 1 carries `progress`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchItem {
    pub position: u32,
    pub name: String,
    /// Localised name as emitted by the game (nested string arrays).
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub localised_name: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchQueue {
    pub queue: Vec<ResearchItem>,
}

/// A raw alert record as reported in a snapshot.
///
/// `tick` changes between polls even when the underlying condition does not.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub tick: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub surface: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Alert {
    pub fn new(tick: u64, kind: impl Into<String>, surface: impl Into<String>) -> Self {
        Self {
            tick,
            kind: kind.into(),
            surface: surface.into(),
            target: None,
            message: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// One parsed stats document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Wall-clock milliseconds at receipt. Stamped by the client, never read
    /// from the payload.
    #[serde(skip_deserializing)]
    pub timestamp: i64,
    pub game_time: u64,
    pub science_packs: SciencePacks,
    pub research: ResearchQueue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<Alert>,
}

/// Item quality tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Quality {
    Normal,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    /// Modded or future tiers
    Other(String),
}

impl Quality {
    pub fn as_str(&self) -> &str {
        match self {
            Quality::Normal => "normal",
            Quality::Uncommon => "uncommon",
            Quality::Rare => "rare",
            Quality::Epic => "epic",
            Quality::Legendary => "legendary",
            Quality::Other(s) => s,
        }
    }

    /// Display colour used by the front-end.
    pub fn color(&self) -> &'static str {
        match self {
            Quality::Normal => "#ffffff",
            Quality::Uncommon => "#4caf50",
            Quality::Rare => "#2196f3",
            Quality::Epic => "#9c27b0",
            Quality::Legendary => "#ff9800",
            Quality::Other(_) => "#ffffff",
        }
    }
}

impl FromStr for Quality {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "normal" => Quality::Normal,
            "uncommon" => Quality::Uncommon,
            "rare" => Quality::Rare,
            "epic" => Quality::Epic,
            "legendary" => Quality::Legendary,
            other => Quality::Other(other.to_string()),
        })
    }
}

impl From<String> for Quality {
    fn from(s: String) -> Self {
        match Quality::from_str(&s) {
            Ok(q) => q,
            Err(never) => match never {},
        }
    }
}

impl From<Quality> for String {
    fn from(q: Quality) -> Self {
        q.as_str().to_string()
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flattened view of one science pack entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedSciencePack {
    #[serde(rename = "type")]
    pub pack_type: String,
    pub quality: Quality,
    pub total: SciencePackStats,
    pub rate: SciencePackStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_deserializes_type_field() {
        let alert: Alert = serde_json::from_str(
            r#"{"tick": 42, "type": "entity_destroyed", "surface": "nauvis", "target": "gun-turret"}"#,
        )
        .unwrap();
        assert_eq!(alert.kind, "entity_destroyed");
        assert_eq!(alert.target.as_deref(), Some("gun-turret"));
        assert!(alert.message.is_none());
    }

    #[test]
    fn test_alert_serialization_skips_absent_fields() {
        let alert = Alert::new(1, "custom", "nauvis");
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "custom");
        assert!(json.get("target").is_none());
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_snapshot_ignores_payload_timestamp() {
        let snapshot: Snapshot =
            serde_json::from_str(r#"{"timestamp": 999, "game_time": 3600}"#).unwrap();
        assert_eq!(snapshot.timestamp, 0);
        assert_eq!(snapshot.game_time, 3600);
    }

    #[test]
    fn test_snapshot_defaults_missing_sections() {
        let snapshot: Snapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.science_packs.total.is_empty());
        assert!(snapshot.research.queue.is_empty());
        assert!(snapshot.alerts.is_empty());
    }

    #[test]
    fn test_quality_from_str_known_and_other() {
        assert_eq!("legendary".parse::<Quality>().unwrap(), Quality::Legendary);
        assert_eq!(
            "mythic".parse::<Quality>().unwrap(),
            Quality::Other("mythic".to_string())
        );
    }

    #[test]
    fn test_quality_serde_as_plain_string() {
        let json = serde_json::to_string(&Quality::Rare).unwrap();
        assert_eq!(json, "\"rare\"");
        let parsed: Quality = serde_json::from_str("\"epic\"").unwrap();
        assert_eq!(parsed, Quality::Epic);
    }

    #[test]
    fn test_quality_colors() {
        assert_eq!(Quality::Uncommon.color(), "#4caf50");
        assert_eq!(Quality::Other("x".into()).color(), "#ffffff");
    }
}
