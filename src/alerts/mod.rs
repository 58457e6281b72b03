//! Alert deduplication log.
//!
//! The exporter reissues every active alert with a fresh `tick` on each
//! snapshot, so alerts are keyed by a tick-independent identity and merged
//! into a bounded log ordered by most recent activity.
//!
//! # Identity
//!
//! `type|surface|target|message`, with absent optional fields rendered as
//! an empty string. An alert without a target therefore shares its identity
//! with one whose target is literally `""`. This is a known limitation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::stats::Alert;

/// Default maximum number of entries kept in the log.
pub const DEFAULT_ALERT_CAPACITY: usize = 1000;

/// Number of entries shown by the "recent alerts" view.
pub const RECENT_ALERTS: usize = 100;

const IDENTITY_SEPARATOR: &str = "|";

/// Compute the tick-independent identity of an alert.
///
/// ```
/// use megabase::alerts::identity_of;
/// use megabase::stats::Alert;
///
/// let alert = Alert::new(1000, "not_enough_construction_robots", "nauvis");
/// assert_eq!(identity_of(&alert), "not_enough_construction_robots|nauvis||");
/// ```
pub fn identity_of(alert: &Alert) -> String {
    [
        alert.kind.as_str(),
        alert.surface.as_str(),
        alert.target.as_deref().unwrap_or(""),
        alert.message.as_deref().unwrap_or(""),
    ]
    .join(IDENTITY_SEPARATOR)
}

/// A deduplicated alert with first/last sighting bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertLogEntry {
    /// The alert as last surfaced; `tick` tracks `latest_tick`.
    #[serde(flatten)]
    pub alert: Alert,
    pub hash: String,
    /// Wall-clock milliseconds when this identity first appeared
    pub first_seen: i64,
    pub first_seen_tick: u64,
    pub latest_tick: u64,
}

impl AlertLogEntry {
    fn new(alert: &Alert, hash: String, now_ms: i64) -> Self {
        Self {
            alert: alert.clone(),
            hash,
            first_seen: now_ms,
            first_seen_tick: alert.tick,
            latest_tick: alert.tick,
        }
    }

    fn observe(&mut self, tick: u64) {
        if tick > self.latest_tick {
            self.latest_tick = tick;
            self.alert.tick = tick;
        }
    }
}

/// Bounded, recency-sorted log of unique alerts.
#[derive(Debug, Clone)]
pub struct AlertLog {
    entries: Vec<AlertLogEntry>,
    capacity: usize,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ALERT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Merge one snapshot's alerts into the log, stamping new identities
    /// with the current wall-clock time.
    pub fn ingest(&mut self, alerts: &[Alert]) {
        self.ingest_at(alerts, chrono::Utc::now().timestamp_millis());
    }

    /// Merge one snapshot's alerts into the log.
    ///
    /// Identities already in the log keep their first sighting and have
    /// `latest_tick` raised if the incoming tick is newer. Identities absent
    /// from this batch are kept as they are; only capacity eviction removes
    /// entries. The log is then re-sorted newest first and truncated.
    pub fn ingest_at(&mut self, alerts: &[Alert], now_ms: i64) {
        if alerts.is_empty() {
            return;
        }

        let mut existing: Vec<Option<AlertLogEntry>> = std::mem::take(&mut self.entries)
            .into_iter()
            .map(Some)
            .collect();
        let lookup: HashMap<String, usize> = existing
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (e.hash.clone(), i)))
            .collect();
        let mut updated: Vec<AlertLogEntry> = Vec::with_capacity(existing.len() + alerts.len());
        let mut this_round: HashMap<String, usize> = HashMap::new();

        for alert in alerts {
            let hash = identity_of(alert);

            // Same identity twice in one batch
            if let Some(&idx) = this_round.get(&hash) {
                updated[idx].observe(alert.tick);
                continue;
            }

            let entry = match lookup.get(&hash).and_then(|&i| existing[i].take()) {
                Some(mut entry) => {
                    entry.observe(alert.tick);
                    entry
                }
                None => AlertLogEntry::new(alert, hash.clone(), now_ms),
            };
            this_round.insert(hash, updated.len());
            updated.push(entry);
        }

        // Not seen this round: kept as is, in their prior order
        updated.extend(existing.into_iter().flatten());

        updated.sort_by(|a, b| b.latest_tick.cmp(&a.latest_tick));
        updated.truncate(self.capacity);

        tracing::trace!(
            incoming = alerts.len(),
            logged = updated.len(),
            "Alert batch merged"
        );

        self.entries = updated;
    }

    /// All entries, most recently active first.
    pub fn entries(&self) -> &[AlertLogEntry] {
        &self.entries
    }

    /// The first `limit` entries.
    pub fn recent(&self, limit: usize) -> &[AlertLogEntry] {
        &self.entries[..limit.min(self.entries.len())]
    }

    /// Number of logged identities per alert type.
    pub fn counts_by_type(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.alert.kind.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn get(&self, hash: &str) -> Option<&AlertLogEntry> {
        self.entries.iter().find(|e| e.hash == hash)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new()
    }
}
