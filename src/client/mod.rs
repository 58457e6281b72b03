//! Stats polling client.
//!
//! Polls the `/api/stats` endpoint on a fixed interval, publishes the latest
//! snapshot, and keeps the derived state the dashboard renders from: a
//! rolling history, the deduplicated alert log and detected data gaps.
//!
//! Each poll cycle is tagged with a sequence number. A slow cycle that
//! completes after a newer one has been applied is discarded, so stale data
//! never overwrites fresh data.

mod config;
mod error;
pub mod history;

pub use config::ClientConfig;
pub use error::FetchError;
pub use history::{HistoryEntry, HistoryPolicy, RollingHistory};

use crate::alerts::{AlertLog, AlertLogEntry, RECENT_ALERTS};
use crate::gaps::{detect_gaps, significant_gaps, DataGap};
use crate::stats::{self, parse_snapshot, ParsedSciencePack, ResearchItem, Snapshot};
use reqwest::Url;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Notification published after every poll cycle that was applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Updated { sequence: u64, timestamp: i64 },
    Failed { sequence: u64, error: String },
}

/// What happened to a completed poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Published as the current snapshot
    Applied { sequence: u64 },
    /// A newer cycle had already been applied
    Stale { sequence: u64 },
}

struct ClientState {
    current: Option<Arc<Snapshot>>,
    error: Option<String>,
    last_update: Option<i64>,
    applied_sequence: u64,
    history: RollingHistory,
    alerts: AlertLog,
}

/// Background poller for the stats endpoint.
pub struct StatsClient {
    client: reqwest::Client,
    config: ClientConfig,
    endpoints: Vec<Result<Url, FetchError>>,
    next_sequence: AtomicU64,
    state: RwLock<ClientState>,
    events: broadcast::Sender<ClientEvent>,
}

impl StatsClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(config: ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .expect("Failed to build HTTP client");
        Self::with_client(config, client)
    }

    /// Create a client with a custom HTTP client (for testing).
    pub fn with_client(config: ClientConfig, client: reqwest::Client) -> Self {
        let endpoints = config
            .endpoints
            .iter()
            .map(|endpoint| resolve_endpoint(&config.origin, endpoint))
            .collect();
        let (events, _) = broadcast::channel(64);

        Self {
            client,
            endpoints,
            next_sequence: AtomicU64::new(0),
            state: RwLock::new(ClientState {
                current: None,
                error: None,
                last_update: None,
                applied_sequence: 0,
                history: RollingHistory::new(config.history),
                alerts: AlertLog::with_capacity(config.alert_capacity),
            }),
            events,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms)
    }

    /// Resolved endpoint URLs, in the order they are tried.
    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints
            .iter()
            .filter_map(|e| e.as_ref().ok().map(|url| url.to_string()))
            .collect()
    }

    /// Subscribe to poll notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Fetch one snapshot, trying each endpoint in order.
    ///
    /// The first 2xx response wins. If every candidate fails, the last
    /// error is returned.
    pub async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let mut last_error = None;

        for endpoint in &self.endpoints {
            let url = match endpoint {
                Ok(url) => url,
                Err(e) => {
                    last_error = Some(e.clone());
                    continue;
                }
            };

            match self.client.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => {
                    let body = response.bytes().await.map_err(|e| {
                        FetchError::from_reqwest(url.as_str(), e, self.config.request_timeout_ms)
                    })?;
                    return Ok(parse_snapshot(&body)?);
                }
                Ok(response) => {
                    tracing::debug!(
                        url = %url,
                        status = response.status().as_u16(),
                        "Stats endpoint returned error status, trying next"
                    );
                    last_error = Some(FetchError::HttpStatus {
                        url: url.to_string(),
                        status: response.status().as_u16(),
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        url = %url,
                        error = %e,
                        "Stats endpoint unreachable, trying next"
                    );
                    last_error = Some(FetchError::from_reqwest(
                        url.as_str(),
                        e,
                        self.config.request_timeout_ms,
                    ));
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::NoEndpoints))
    }

    /// Run one poll cycle and apply its result.
    pub async fn poll_once(&self) -> Result<PollOutcome, FetchError> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let started = std::time::Instant::now();
        let result = self.fetch().await;
        metrics::histogram!("megabase_poll_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(snapshot) => {
                let now = chrono::Utc::now().timestamp_millis();
                metrics::counter!("megabase_polls_total", "outcome" => "success").increment(1);
                Ok(self.apply_snapshot(sequence, now, snapshot))
            }
            Err(e) => {
                metrics::counter!("megabase_polls_total", "outcome" => e.kind()).increment(1);
                tracing::warn!(sequence, error = %e, "Stats poll failed");
                self.apply_error(sequence, &e);
                Err(e)
            }
        }
    }

    /// Manual refresh outside the polling schedule.
    pub async fn refresh(&self) -> Result<PollOutcome, FetchError> {
        self.poll_once().await
    }

    /// Publish a successful poll result unless a newer one was applied.
    ///
    /// `now` becomes the snapshot's receipt timestamp, clamped so it never
    /// precedes the newest history entry.
    pub fn apply_snapshot(&self, sequence: u64, now: i64, mut snapshot: Snapshot) -> PollOutcome {
        let mut state = self.write_state();

        if sequence <= state.applied_sequence {
            tracing::debug!(
                sequence,
                applied = state.applied_sequence,
                "Discarding out-of-order poll result"
            );
            return PollOutcome::Stale { sequence };
        }

        let now = state.history.clamp_timestamp(now);
        snapshot.timestamp = now;
        let snapshot = Arc::new(snapshot);
        state.alerts.ingest_at(&snapshot.alerts, now);
        state.history.push(now, Arc::clone(&snapshot));
        state.current = Some(snapshot);
        state.error = None;
        state.last_update = Some(now);
        state.applied_sequence = sequence;
        drop(state);

        tracing::debug!(sequence, "Stats snapshot applied");
        // Ignore error if no receivers are listening
        let _ = self.events.send(ClientEvent::Updated {
            sequence,
            timestamp: now,
        });
        PollOutcome::Applied { sequence }
    }

    /// Publish a failed poll. The current snapshot is left in place.
    fn apply_error(&self, sequence: u64, error: &FetchError) {
        let mut state = self.write_state();
        if sequence <= state.applied_sequence {
            return;
        }
        state.error = Some(error.to_string());
        drop(state);

        let _ = self.events.send(ClientEvent::Failed {
            sequence,
            error: error.to_string(),
        });
    }

    /// Start polling in the background.
    ///
    /// Fetches immediately, then every `interval` until the token is
    /// cancelled. Each cycle runs in its own task so a slow request never
    /// delays the schedule. Cancelling stops future cycles; one already in
    /// flight may still apply.
    pub fn start(
        self: Arc<Self>,
        interval: Duration,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = interval.max(Duration::from_millis(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            tracing::info!(
                interval_ms = period.as_millis() as u64,
                endpoints = ?self.endpoints(),
                "Stats polling started"
            );

            loop {
                tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => {
                        tracing::info!("Stats polling stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let client = Arc::clone(&self);
                        tokio::spawn(async move {
                            let _ = client.poll_once().await;
                        });
                    }
                }
            }
        })
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.read_state().current.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.read_state().error.clone()
    }

    /// Wall-clock milliseconds of the last applied snapshot.
    pub fn last_update(&self) -> Option<i64> {
        self.read_state().last_update
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.read_state().history.entries()
    }

    pub fn parsed_science_packs(&self) -> Vec<ParsedSciencePack> {
        self.current()
            .map(|s| stats::parsed_science_packs(&s))
            .unwrap_or_default()
    }

    pub fn current_research(&self) -> Option<ResearchItem> {
        self.current()
            .and_then(|s| stats::current_research(&s).cloned())
    }

    pub fn research_queue(&self) -> Vec<ResearchItem> {
        self.current()
            .map(|s| stats::research_queue(&s).to_vec())
            .unwrap_or_default()
    }

    /// Full alert log, most recently active first.
    pub fn alerts(&self) -> Vec<AlertLogEntry> {
        self.read_state().alerts.entries().to_vec()
    }

    pub fn recent_alerts(&self) -> Vec<AlertLogEntry> {
        self.read_state().alerts.recent(RECENT_ALERTS).to_vec()
    }

    pub fn alert_counts_by_type(&self) -> BTreeMap<String, usize> {
        self.read_state().alerts.counts_by_type()
    }

    pub fn clear_alerts(&self) {
        self.write_state().alerts.clear();
    }

    /// Significant gaps in the polled history.
    pub fn gaps(&self) -> Vec<DataGap> {
        let timestamps = self.read_state().history.timestamps();
        let gaps = detect_gaps(
            &timestamps,
            self.config.poll_interval_ms as i64,
            self.config.gap_threshold_multiplier,
        );
        significant_gaps(&gaps, self.config.min_gap_ms)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ClientState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ClientState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Turn an endpoint entry into a URL; relative paths are joined to `origin`.
fn resolve_endpoint(origin: &str, endpoint: &str) -> Result<Url, FetchError> {
    let resolved = if endpoint.contains("://") {
        Url::parse(endpoint)
    } else {
        Url::parse(origin).and_then(|base| base.join(endpoint))
    };

    resolved.map_err(|e| FetchError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}
