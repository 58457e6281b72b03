//! Rolling snapshot history.
//!
//! A time-ordered buffer of past snapshots for charting, bounded either by
//! entry count or by age. Pruning runs after every push.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::stats::Snapshot;

/// How the rolling history is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum HistoryPolicy {
    /// Keep the newest `max_entries` snapshots
    MaxEntries { max_entries: usize },
    /// Keep snapshots no older than `max_age_ms` relative to the newest push
    MaxAge { max_age_ms: i64 },
}

impl Default for HistoryPolicy {
    /// 60 entries: five minutes at the default 5 s interval.
    fn default() -> Self {
        HistoryPolicy::MaxEntries { max_entries: 60 }
    }
}

/// One polled snapshot with its receipt time.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: i64,
    pub snapshot: Arc<Snapshot>,
}

/// Bounded buffer of [`HistoryEntry`], ascending by timestamp.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    entries: VecDeque<HistoryEntry>,
    policy: HistoryPolicy,
}

impl RollingHistory {
    pub fn new(policy: HistoryPolicy) -> Self {
        let capacity = match policy {
            HistoryPolicy::MaxEntries { max_entries } => max_entries,
            HistoryPolicy::MaxAge { .. } => 0,
        };
        Self {
            entries: VecDeque::with_capacity(capacity),
            policy,
        }
    }

    /// The timestamp `push` would record for `timestamp`.
    ///
    /// A timestamp earlier than the newest entry (wall clock stepped back)
    /// is clamped to it so ordering stays ascending.
    pub fn clamp_timestamp(&self, timestamp: i64) -> i64 {
        match self.entries.back() {
            Some(last) if timestamp < last.timestamp => last.timestamp,
            _ => timestamp,
        }
    }

    /// Append an entry and prune. Returns the timestamp actually recorded.
    pub fn push(&mut self, timestamp: i64, snapshot: Arc<Snapshot>) -> i64 {
        let timestamp = self.clamp_timestamp(timestamp);

        self.entries.push_back(HistoryEntry {
            timestamp,
            snapshot,
        });
        self.prune(timestamp);
        timestamp
    }

    fn prune(&mut self, now: i64) {
        match self.policy {
            HistoryPolicy::MaxEntries { max_entries } => {
                while self.entries.len() > max_entries {
                    self.entries.pop_front();
                }
            }
            HistoryPolicy::MaxAge { max_age_ms } => {
                let cutoff = now - max_age_ms;
                while self
                    .entries
                    .front()
                    .is_some_and(|entry| entry.timestamp < cutoff)
                {
                    self.entries.pop_front();
                }
            }
        }
    }

    /// All entries in chronological order (oldest first)
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.entries.iter().map(|e| e.timestamp).collect()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RollingHistory {
    fn default() -> Self {
        Self::new(HistoryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(game_time: u64) -> Arc<Snapshot> {
        Arc::new(Snapshot {
            game_time,
            ..Default::default()
        })
    }

    #[test]
    fn test_new_creates_empty_history() {
        let history = RollingHistory::default();
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
        assert!(history.latest().is_none());
    }

    #[test]
    fn test_max_entries_evicts_oldest() {
        let mut history = RollingHistory::new(HistoryPolicy::MaxEntries { max_entries: 60 });
        for i in 0..61 {
            history.push(i * 5_000, snap(i as u64));
        }

        assert_eq!(history.len(), 60);
        let entries = history.entries();
        assert_eq!(entries[0].timestamp, 5_000);
        assert_eq!(entries[0].snapshot.game_time, 1);
        assert_eq!(entries[59].timestamp, 300_000);
        assert!(history.timestamps().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_max_age_drops_stale_entries() {
        let mut history = RollingHistory::new(HistoryPolicy::MaxAge { max_age_ms: 10_000 });
        history.push(0, snap(0));
        history.push(5_000, snap(1));
        history.push(10_000, snap(2));
        assert_eq!(history.len(), 3);

        history.push(15_001, snap(3));
        assert_eq!(history.timestamps(), vec![10_000, 15_001]);
    }

    #[test]
    fn test_max_age_keeps_everything_within_window() {
        let mut history = RollingHistory::new(HistoryPolicy::MaxAge { max_age_ms: 60_000 });
        for i in 0..100 {
            history.push(i * 100, snap(i as u64));
        }
        assert_eq!(history.len(), 100);
    }

    #[test]
    fn test_backwards_timestamp_clamped() {
        let mut history = RollingHistory::default();
        assert_eq!(history.push(10_000, snap(0)), 10_000);
        assert_eq!(history.clamp_timestamp(9_000), 10_000);
        assert_eq!(history.push(9_000, snap(1)), 10_000);

        assert_eq!(history.timestamps(), vec![10_000, 10_000]);
        assert_eq!(history.latest().unwrap().snapshot.game_time, 1);
    }

    #[test]
    fn test_history_policy_serde_tagged() {
        let json = serde_json::to_value(HistoryPolicy::MaxAge { max_age_ms: 5 }).unwrap();
        assert_eq!(json["policy"], "max_age");
        assert_eq!(json["max_age_ms"], 5);
    }
}
