//! Discontinuity detection for polled time series.
//!
//! A gap is a pair of consecutive samples further apart than the polling
//! interval allows. Charts use gaps to avoid interpolating across periods
//! where no data was collected.

use serde::{Deserialize, Serialize};

/// Default multiple of the expected interval beyond which a delta is a gap.
pub const DEFAULT_THRESHOLD_MULTIPLIER: f64 = 2.0;

/// A detected interval between consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataGap {
    pub start_index: usize,
    pub end_index: usize,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    /// `end_timestamp - start_timestamp`, in milliseconds
    pub duration: i64,
}

/// Report every consecutive pair whose delta exceeds
/// `expected_interval_ms * threshold_multiplier`.
///
/// Timestamps are assumed ascending.
///
/// ```
/// use megabase::gaps::detect_gaps;
///
/// let gaps = detect_gaps(&[0, 5_000, 20_000], 5_000, 2.0);
/// assert_eq!(gaps.len(), 1);
/// assert_eq!((gaps[0].start_index, gaps[0].end_index), (1, 2));
/// ```
pub fn detect_gaps(
    timestamps: &[i64],
    expected_interval_ms: i64,
    threshold_multiplier: f64,
) -> Vec<DataGap> {
    let threshold = expected_interval_ms as f64 * threshold_multiplier;

    timestamps
        .windows(2)
        .enumerate()
        .filter_map(|(i, pair)| {
            let duration = pair[1] - pair[0];
            (duration as f64 > threshold).then_some(DataGap {
                start_index: i,
                end_index: i + 1,
                start_timestamp: pair[0],
                end_timestamp: pair[1],
                duration,
            })
        })
        .collect()
}

/// Keep only gaps lasting at least `min_duration_ms`.
pub fn significant_gaps(gaps: &[DataGap], min_duration_ms: i64) -> Vec<DataGap> {
    gaps.iter()
        .filter(|gap| gap.duration >= min_duration_ms)
        .copied()
        .collect()
}

/// Human-readable gap length, e.g. `"2m 5s gap"`.
pub fn format_gap_duration(duration_ms: i64) -> String {
    let seconds = duration_ms.max(0) / 1000;

    if seconds < 60 {
        format!("{}s gap", seconds)
    } else if seconds < 3600 {
        let minutes = seconds / 60;
        let remaining = seconds % 60;
        if remaining > 0 {
            format!("{}m {}s gap", minutes, remaining)
        } else {
            format!("{}m gap", minutes)
        }
    } else {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        if minutes > 0 {
            format!("{}h {}m gap", hours, minutes)
        } else {
            format!("{}h gap", hours)
        }
    }
}
