//! Server-side cache of the exporter's stats file.
//!
//! The cache owns a single state cell (a `tokio::sync::watch` channel of
//! `Arc<CachedStats>`). Reloads build a complete new value and swap the
//! reference, so concurrent readers see either the old or the new document,
//! never a partial one. A failed reload keeps the last good document.

mod error;

pub use error::CacheError;

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const NOT_LOADED_MESSAGE: &str = "No stats available";

/// How often [`StatsCache::watch`] retries while the stats directory is missing.
pub const WATCH_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Contents of the cache cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedStats {
    /// Last successfully loaded document
    Loaded {
        body: Bytes,
        modified: Option<DateTime<Utc>>,
        loaded_at: DateTime<Utc>,
    },
    /// No successful load yet
    Unavailable { message: String },
}

impl CachedStats {
    pub fn is_loaded(&self) -> bool {
        matches!(self, CachedStats::Loaded { .. })
    }

    /// Document body, or the `{"error": ...}` sentinel.
    pub fn body(&self) -> Bytes {
        match self {
            CachedStats::Loaded { body, .. } => body.clone(),
            CachedStats::Unavailable { message } => {
                Bytes::from(serde_json::json!({ "error": message }).to_string())
            }
        }
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        match self {
            CachedStats::Loaded { modified, .. } => *modified,
            CachedStats::Unavailable { .. } => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CachedStats::Loaded { body, .. } => body.len(),
            CachedStats::Unavailable { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Watches and caches `stats.json`.
pub struct StatsCache {
    path: PathBuf,
    state: watch::Sender<Arc<CachedStats>>,
}

impl StatsCache {
    /// Create an empty cache for `path` without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (state, _) = watch::channel(Arc::new(CachedStats::Unavailable {
            message: NOT_LOADED_MESSAGE.to_string(),
        }));
        Self {
            path: path.into(),
            state,
        }
    }

    /// Create the cache and perform the initial load.
    ///
    /// A failed initial load is logged and leaves the error sentinel in place.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let cache = Self::new(path);
        let _ = cache.reload().await;
        cache
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the cache cell.
    pub fn current(&self) -> Arc<CachedStats> {
        Arc::clone(&self.state.borrow())
    }

    /// Latest good document bytes, or the error sentinel.
    pub fn current_stats(&self) -> Bytes {
        self.current().body()
    }

    /// Receive a notification on every swap.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CachedStats>> {
        self.state.subscribe()
    }

    /// Re-read the stats file and swap it in.
    ///
    /// On failure the previous document is kept. If nothing has loaded yet,
    /// the sentinel message is updated to describe the failure.
    pub async fn reload(&self) -> Result<(), CacheError> {
        match read_stats(&self.path).await {
            Ok(loaded) => {
                let bytes = loaded.len();
                self.state.send_replace(Arc::new(loaded));

                metrics::counter!("megabase_stats_reloads_total", "result" => "success")
                    .increment(1);
                metrics::gauge!("megabase_stats_bytes").set(bytes as f64);
                tracing::info!(path = %self.path.display(), bytes, "Loaded stats file");
                Ok(())
            }
            Err(e) => {
                metrics::counter!("megabase_stats_reloads_total", "result" => "failure")
                    .increment(1);

                if self.current().is_loaded() {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Failed to reload stats file, keeping previous snapshot"
                    );
                } else {
                    tracing::error!(
                        path = %self.path.display(),
                        error = %e,
                        "Failed to load stats file"
                    );
                    self.state.send_replace(Arc::new(CachedStats::Unavailable {
                        message: e.client_message(),
                    }));
                }
                Err(e)
            }
        }
    }

    /// Reload whenever the stats file changes.
    ///
    /// Watches the parent directory so that files replaced by rename, or
    /// created after startup, are still picked up. Queued events are
    /// coalesced into a single reload. If the directory does not exist yet
    /// the watcher is re-attached every [`WATCH_RETRY_INTERVAL`] until it
    /// does, and the sentinel keeps being served meanwhile.
    pub fn watch(
        self: Arc<Self>,
        cancel_token: CancellationToken,
    ) -> Result<JoinHandle<()>, CacheError> {
        self.watch_with_retry(cancel_token, WATCH_RETRY_INTERVAL)
    }

    /// [`watch`](Self::watch) with a custom attach retry interval.
    pub fn watch_with_retry(
        self: Arc<Self>,
        cancel_token: CancellationToken,
        retry_interval: Duration,
    ) -> Result<JoinHandle<()>, CacheError> {
        let file_name: OsString = self
            .path
            .file_name()
            .ok_or_else(|| CacheError::InvalidPath(self.path.clone()))?
            .to_os_string();
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(tokio::spawn(async move {
            let Some((watcher, mut notify_receiver)) = self
                .attach_watcher(&dir, retry_interval, &cancel_token)
                .await
            else {
                tracing::info!("Stats watcher shutting down");
                return;
            };
            // Dropping the watcher stops notifications
            let _watcher = watcher;

            loop {
                tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => {
                        tracing::info!("Stats watcher shutting down");
                        break;
                    }
                    received = notify_receiver.recv() => {
                        let Some(first) = received else {
                            break;
                        };
                        let mut changed = is_stats_change(&first, &file_name);
                        while let Ok(next) = notify_receiver.try_recv() {
                            changed |= is_stats_change(&next, &file_name);
                        }

                        if changed {
                            tracing::debug!("Stats file changed, reloading");
                            let _ = self.reload().await;
                        }
                    }
                }
            }
        }))
    }

    /// Attach the OS watcher to `dir`, retrying until it succeeds or the
    /// token is cancelled.
    async fn attach_watcher(
        &self,
        dir: &Path,
        retry_interval: Duration,
        cancel_token: &CancellationToken,
    ) -> Option<(RecommendedWatcher, WatchEvents)> {
        let mut retried = false;

        loop {
            match start_watcher(dir) {
                Ok(attached) => {
                    tracing::info!(path = %self.path.display(), "Watching stats file");
                    // Written before the watcher attached, so no event will arrive
                    if retried && tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
                        let _ = self.reload().await;
                    }
                    return Some(attached);
                }
                Err(e) if !retried => {
                    tracing::warn!(
                        dir = %dir.display(),
                        error = %e,
                        retry_ms = retry_interval.as_millis() as u64,
                        "Stats directory not watchable yet, retrying"
                    );
                }
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "Stats watcher retry failed");
                }
            }
            retried = true;

            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => return None,
                _ = tokio::time::sleep(retry_interval) => {}
            }
        }
    }
}

type WatchEvents = mpsc::UnboundedReceiver<notify::Result<Event>>;

fn start_watcher(dir: &Path) -> Result<(RecommendedWatcher, WatchEvents), CacheError> {
    let (notify_sender, notify_receiver) = mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
        if notify_sender.send(result).is_err() {
            tracing::debug!("Stats watcher notification receiver dropped");
        }
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;

    Ok((watcher, notify_receiver))
}

fn is_stats_change(result: &Result<Event, notify::Error>, file_name: &OsStr) -> bool {
    match result {
        Ok(event) => {
            matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                && event
                    .paths
                    .iter()
                    .any(|path| path.file_name() == Some(file_name))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Stats watcher error");
            false
        }
    }
}

async fn read_stats(path: &Path) -> Result<CachedStats, CacheError> {
    let io_error = |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };

    let body = tokio::fs::read(path).await.map_err(io_error)?;
    let metadata = tokio::fs::metadata(path).await.map_err(io_error)?;

    serde_json::from_slice::<serde::de::IgnoredAny>(&body).map_err(|e| {
        CacheError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    Ok(CachedStats::Loaded {
        body: Bytes::from(body),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        loaded_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STATS: &str = r#"{"game_time": 60, "research": {"queue": []}}"#;

    fn stats_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("stats.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn sentinel_message(cache: &StatsCache) -> String {
        let value: serde_json::Value = serde_json::from_slice(&cache.current_stats()).unwrap();
        value["error"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_new_cache_serves_sentinel() {
        let cache = StatsCache::new("/nonexistent/stats.json");
        assert!(!cache.current().is_loaded());
        assert_eq!(sentinel_message(&cache), "No stats available");
    }

    #[tokio::test]
    async fn test_load_reads_file() {
        let dir = TempDir::new().unwrap();
        let cache = StatsCache::load(stats_file(&dir, STATS)).await;

        let current = cache.current();
        assert!(current.is_loaded());
        assert_eq!(current.len(), STATS.len());
        assert!(current.modified().is_some());
        assert_eq!(cache.current_stats(), Bytes::from(STATS));
    }

    #[tokio::test]
    async fn test_initial_load_missing_file_sentinel() {
        let dir = TempDir::new().unwrap();
        let cache = StatsCache::load(dir.path().join("stats.json")).await;

        assert!(!cache.current().is_loaded());
        assert_eq!(sentinel_message(&cache), "Stats file not found");
    }

    #[tokio::test]
    async fn test_initial_load_malformed_sentinel() {
        let dir = TempDir::new().unwrap();
        let cache = StatsCache::load(stats_file(&dir, "{\"game_time\": ")).await;
        assert_eq!(sentinel_message(&cache), "Stats file malformed");
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous() {
        let dir = TempDir::new().unwrap();
        let path = stats_file(&dir, STATS);
        let cache = StatsCache::load(&path).await;

        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            cache.reload().await,
            Err(CacheError::Malformed { .. })
        ));
        assert_eq!(cache.current_stats(), Bytes::from(STATS));

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(cache.reload().await, Err(CacheError::Io { .. })));
        assert_eq!(cache.current_stats(), Bytes::from(STATS));
    }

    #[tokio::test]
    async fn test_reload_swaps_in_new_content() {
        let dir = TempDir::new().unwrap();
        let path = stats_file(&dir, STATS);
        let cache = StatsCache::load(&path).await;
        let before = cache.current();

        let updated = r#"{"game_time": 120}"#;
        std::fs::write(&path, updated).unwrap();
        cache.reload().await.unwrap();

        assert_eq!(cache.current_stats(), Bytes::from(updated));
        // Readers holding the old reference still see the old document
        assert_eq!(before.body(), Bytes::from(STATS));
    }

    #[tokio::test]
    async fn test_recovers_after_initial_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");
        let cache = StatsCache::load(&path).await;
        assert!(!cache.current().is_loaded());

        std::fs::write(&path, STATS).unwrap();
        cache.reload().await.unwrap();
        assert!(cache.current().is_loaded());
    }

    #[tokio::test]
    async fn test_subscribers_notified_on_swap() {
        let dir = TempDir::new().unwrap();
        let path = stats_file(&dir, STATS);
        let cache = StatsCache::new(&path);
        let mut rx = cache.subscribe();

        cache.reload().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_loaded());
    }

    #[test]
    fn test_is_stats_change_filters_by_name_and_kind() {
        let name = OsStr::new("stats.json");
        let modify = Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(PathBuf::from("/x/stats.json"));
        let other = Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(PathBuf::from("/x/other.json"));
        let remove = Event::new(EventKind::Remove(notify::event::RemoveKind::File))
            .add_path(PathBuf::from("/x/stats.json"));

        assert!(is_stats_change(&Ok(modify), name));
        assert!(!is_stats_change(&Ok(other), name));
        assert!(!is_stats_change(&Ok(remove), name));
    }

    #[tokio::test]
    async fn test_watch_rejects_path_without_file_name() {
        let cache = Arc::new(StatsCache::new("/"));
        let result = cache.watch(CancellationToken::new());
        assert!(matches!(result, Err(CacheError::InvalidPath(_))));
    }
}
