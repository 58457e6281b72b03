//! Output formatting helpers for CLI commands

use crate::alerts::AlertLogEntry;
use crate::client::{HistoryEntry, StatsClient};
use crate::gaps::{format_gap_duration, DataGap};
use crate::stats::{ParsedSciencePack, Quality, ResearchItem};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;
use std::collections::BTreeMap;

/// Alerts shown in the terminal table
const ALERT_ROWS: usize = 10;

/// Everything `watch` prints, captured at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct WatchReport {
    pub timestamp: Option<i64>,
    pub game_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub science_packs: Vec<ParsedSciencePack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_research: Option<ResearchItem>,
    /// Game ticks until the current research finishes at its recent pace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_eta_ticks: Option<u64>,
    /// Queued after the current item
    pub research: Vec<ResearchItem>,
    pub alert_counts: BTreeMap<String, usize>,
    pub recent_alerts: Vec<AlertLogEntry>,
    pub gaps: Vec<DataGap>,
}

impl WatchReport {
    pub fn from_client(client: &StatsClient) -> Self {
        Self {
            timestamp: client.last_update(),
            game_time: client.current().map(|s| s.game_time),
            error: client.error(),
            science_packs: client.parsed_science_packs(),
            current_research: client.current_research(),
            research_eta_ticks: research_eta_ticks(&client.history()),
            research: client.research_queue(),
            alert_counts: client.alert_counts_by_type(),
            recent_alerts: client.recent_alerts(),
            gaps: client.gaps(),
        }
    }
}

/// Game ticks left for `total` units at `rate` units per game minute,
/// given the completed fraction `progress`.
///
/// Zero when the rate is zero or the work is already done.
pub fn time_remaining_ticks(progress: f64, rate: f64, total: f64) -> f64 {
    if rate == 0.0 || progress >= 1.0 {
        return 0.0;
    }
    let remaining = total * (1.0 - progress);
    remaining / rate * 60.0 * 60.0
}

/// Progress per game minute of the newest snapshot's current research,
/// measured across the history entries researching the same technology.
pub fn research_progress_rate(history: &[HistoryEntry]) -> Option<f64> {
    let latest = history.last()?;
    let current = latest.snapshot.research.queue.first()?;
    let latest_progress = current.progress?;

    let earliest = history.iter().find_map(|entry| {
        let item = entry.snapshot.research.queue.first()?;
        (item.name == current.name && item.level == current.level)
            .then_some((entry.snapshot.game_time, item.progress?))
    })?;

    let elapsed_ticks = latest.snapshot.game_time.checked_sub(earliest.0)?;
    let gained = latest_progress - earliest.1;
    if elapsed_ticks == 0 || gained <= 0.0 {
        return None;
    }
    Some(gained / (elapsed_ticks as f64 / 3_600.0))
}

/// Estimated ticks until the current research completes.
pub fn research_eta_ticks(history: &[HistoryEntry]) -> Option<u64> {
    let rate = research_progress_rate(history)?;
    let progress = history.last()?.snapshot.research.queue.first()?.progress?;
    Some(time_remaining_ticks(progress, rate, 1.0).round() as u64)
}

/// Format a number with k/M/B suffix
pub fn format_number(value: f64, decimals: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let abs = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };

    if abs >= 1_000_000_000.0 {
        format!("{}{:.*}B", sign, decimals, abs / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("{}{:.*}M", sign, decimals, abs / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{}{:.*}k", sign, decimals, abs / 1_000.0)
    } else {
        format!("{}{:.0}", sign, abs)
    }
}

/// Items per minute
pub fn format_rate(value: f64) -> String {
    if value == 0.0 {
        return "0/m".to_string();
    }
    format!("{}/m", format_number(value, 1))
}

/// Game ticks (60 per second) as `1d 2h`, `3h 4m`, `5m 6s` or `7s`.
pub fn format_ticks(ticks: u64) -> String {
    let seconds = ticks / 60;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `logistic-system` -> `Logistic System`
pub fn prettify_name(name: &str) -> String {
    if name.is_empty() {
        return "Unknown".to_string();
    }
    name.split('-').map(capitalize).collect::<Vec<_>>().join(" ")
}

/// `metallurgic-science-pack` -> `Metallurgic`
pub fn science_pack_short_name(name: &str) -> String {
    name.replacen("-science-pack", "", 1)
        .split('-')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Age of `timestamp` relative to `now`, e.g. `-45s`, `-2m 30s`, `-1h 15m`.
pub fn format_relative_time(timestamp: i64, now: i64) -> String {
    let seconds_ago = ((now - timestamp) as f64 / 1000.0).round() as i64;

    if seconds_ago <= 0 {
        return "now".to_string();
    }
    if seconds_ago < 60 {
        return format!("-{}s", seconds_ago);
    }
    if seconds_ago < 3600 {
        let minutes = seconds_ago / 60;
        let seconds = seconds_ago % 60;
        if minutes < 5 && seconds > 0 {
            return format!("-{}m {}s", minutes, seconds);
        }
        return format!("-{}m", minutes);
    }

    let hours = seconds_ago / 3600;
    let minutes = (seconds_ago % 3600) / 60;
    if minutes > 0 {
        format!("-{}h {}m", hours, minutes)
    } else {
        format!("-{}h", hours)
    }
}

fn colored_quality(quality: &Quality) -> String {
    let name = capitalize(quality.as_str());
    match quality {
        Quality::Normal | Quality::Other(_) => name,
        Quality::Uncommon => name.green().to_string(),
        Quality::Rare => name.blue().to_string(),
        Quality::Epic => name.magenta().to_string(),
        Quality::Legendary => name.yellow().to_string(),
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

/// Format science packs as a table
pub fn format_science_table(packs: &[ParsedSciencePack]) -> String {
    let mut table = new_table(vec!["Pack", "Quality", "Produced", "Consumed", "Rate"]);

    for pack in packs {
        table.add_row(vec![
            Cell::new(science_pack_short_name(&pack.pack_type)),
            Cell::new(colored_quality(&pack.quality)),
            Cell::new(format_number(pack.total.produced, 1)).set_alignment(CellAlignment::Right),
            Cell::new(format_number(pack.total.consumed, 1)).set_alignment(CellAlignment::Right),
            Cell::new(format_rate(pack.rate.consumed)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

/// Format the research queue as a table
///
/// `eta_ticks` is shown against the first row, the one being researched.
pub fn format_research_table(queue: &[ResearchItem], eta_ticks: Option<u64>) -> String {
    let mut table = new_table(vec!["#", "Technology", "Level", "Progress", "ETA"]);

    for (index, item) in queue.iter().enumerate() {
        let progress = match item.progress {
            Some(p) => format!("{:.1}%", p * 100.0),
            None => String::new(),
        };
        let eta = match eta_ticks {
            Some(ticks) if index == 0 => format_ticks(ticks),
            _ => String::new(),
        };
        table.add_row(vec![
            Cell::new(item.position),
            Cell::new(prettify_name(&item.name)),
            Cell::new(item.level.map(|l| l.to_string()).unwrap_or_default()),
            Cell::new(progress).set_alignment(CellAlignment::Right),
            Cell::new(eta).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

/// Format alert log entries as a table
pub fn format_alerts_table(alerts: &[AlertLogEntry], now: i64) -> String {
    let mut table = new_table(vec!["Type", "Surface", "Target", "Message", "First seen"]);

    for entry in alerts {
        let alert = &entry.alert;
        table.add_row(vec![
            Cell::new(alert.kind.red().to_string()),
            Cell::new(&alert.surface),
            Cell::new(alert.target.as_deref().unwrap_or("")),
            Cell::new(alert.message.as_deref().unwrap_or("")),
            Cell::new(format_relative_time(entry.first_seen, now)),
        ]);
    }

    table.to_string()
}

/// Render a report for the terminal
pub fn format_report(report: &WatchReport, now: i64) -> String {
    let mut out = String::new();

    let header = match (report.game_time, report.timestamp) {
        (Some(ticks), Some(ts)) => format!(
            "Game time {} (updated {})",
            format_ticks(ticks),
            format_relative_time(ts, now)
        ),
        _ => "Waiting for stats...".to_string(),
    };
    out.push_str(&header.bold().to_string());
    out.push('\n');

    if let Some(ref error) = report.error {
        out.push_str(&format!("{} {}\n", "✗".red(), error.red()));
    }

    if !report.science_packs.is_empty() {
        out.push_str(&format_science_table(&report.science_packs));
        out.push('\n');
    }

    let research: Vec<ResearchItem> = report
        .current_research
        .iter()
        .chain(&report.research)
        .cloned()
        .collect();
    if !research.is_empty() {
        let eta = report
            .current_research
            .as_ref()
            .and(report.research_eta_ticks);
        out.push_str(&format_research_table(&research, eta));
        out.push('\n');
    }

    if !report.alert_counts.is_empty() {
        let counts: Vec<String> = report
            .alert_counts
            .iter()
            .map(|(kind, count)| format!("{} {}", kind, count))
            .collect();
        out.push_str(&format!("Alerts: {}\n", counts.join(", ")));
        let shown = report.recent_alerts.len().min(ALERT_ROWS);
        out.push_str(&format_alerts_table(&report.recent_alerts[..shown], now));
        out.push('\n');
    }

    for gap in &report.gaps {
        out.push_str(&format!(
            "{} {}\n",
            "⚠".yellow(),
            format_gap_duration(gap.duration)
        ));
    }

    out
}

/// Format a report as JSON
pub fn format_report_json(report: &WatchReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
