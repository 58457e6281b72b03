//! Stats document model and derived views.
//!
//! The exporter writes `stats.json` with science pack counters keyed by a
//! composite `<pack-type>_<quality>` string, the research queue, and the
//! currently active alerts. Everything here is pure: the views are
//! recomputed from a [`Snapshot`] on demand.

mod error;
pub mod types;

pub use error::SnapshotError;
pub use types::*;

/// Split a composite science key into pack type and quality.
///
/// The last `_`-separated part is the quality; the remaining parts are
/// re-joined with `-`. Keys with fewer than two parts are rejected.
///
/// ```
/// use megabase::stats::{parse_science_key, Quality};
///
/// let (pack, quality) = parse_science_key("automation-science-pack_rare").unwrap();
/// assert_eq!(pack, "automation-science-pack");
/// assert_eq!(quality, Quality::Rare);
/// assert!(parse_science_key("science").is_none());
/// ```
pub fn parse_science_key(key: &str) -> Option<(String, Quality)> {
    let parts: Vec<&str> = key.split('_').collect();
    if parts.len() < 2 {
        return None;
    }
    let (quality, pack) = parts.split_last()?;
    Some((pack.join("-"), quality.parse().unwrap_or(Quality::Normal)))
}

/// Build a composite science key from pack type and quality.
pub fn science_key(pack_type: &str, quality: &Quality) -> String {
    format!("{}_{}", pack_type, quality)
}

/// Flatten the composite science mapping into discrete records.
///
/// Entries come out in ascending key order. A pack present in `total` but
/// missing from `rate_1m` gets an all-zero rate.
pub fn parsed_science_packs(snapshot: &Snapshot) -> Vec<ParsedSciencePack> {
    snapshot
        .science_packs
        .total
        .iter()
        .filter_map(|(key, total)| {
            let (pack_type, quality) = parse_science_key(key)?;
            let rate = snapshot
                .science_packs
                .rate_1m
                .get(key)
                .copied()
                .unwrap_or_default();
            Some(ParsedSciencePack {
                pack_type,
                quality,
                total: *total,
                rate,
            })
        })
        .collect()
}

/// The research item at queue position 1, if any.
pub fn current_research(snapshot: &Snapshot) -> Option<&ResearchItem> {
    snapshot.research.queue.first()
}

/// Queued research after the current item.
pub fn research_queue(snapshot: &Snapshot) -> &[ResearchItem] {
    snapshot.research.queue.get(1..).unwrap_or(&[])
}

/// Parse a stats document body.
///
/// The server answers with `{"error": "..."}` until its first successful
/// load; that sentinel is reported as [`SnapshotError::Upstream`] rather
/// than being read as an empty snapshot.
pub fn parse_snapshot(body: &[u8]) -> Result<Snapshot, SnapshotError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| SnapshotError::Malformed(e.to_string()))?;

    if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
        if value.get("science_packs").is_none() {
            return Err(SnapshotError::Upstream(message.to_string()));
        }
    }

    serde_json::from_value(value).map_err(|e| SnapshotError::Malformed(e.to_string()))
}
