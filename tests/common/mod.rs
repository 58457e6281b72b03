//! Shared test utilities for megabase integration tests.
//!
//! Provides a throwaway game installation on disk plus helpers for
//! building the router and reading responses.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::Response;
use megabase::api::{create_router, AppState};
use megabase::cache::StatsCache;
use megabase::config::DashboardConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A realistic exporter document.
pub const SAMPLE_STATS: &str = r#"{
    "game_time": 216000,
    "science_packs": {
        "total": {
            "automation-science-pack_normal": {"produced": 1500, "consumed": 1200, "stored": 300},
            "space-science-pack_legendary": {"produced": 40, "consumed": 10, "stored": 30}
        },
        "rate_1m": {
            "automation-science-pack_normal": {"produced": 60, "consumed": 45, "stored": 0}
        }
    },
    "research": {
        "queue": [
            {"position": 1, "name": "mining-productivity", "level": 3, "progress": 0.42},
            {"position": 2, "name": "worker-robot-speed", "level": 7}
        ]
    },
    "alerts": [
        {"tick": 215990, "type": "entity_destroyed", "surface": "nauvis", "target": "gun-turret"},
        {"tick": 215000, "type": "no_material_for_construction", "surface": "vulcanus"}
    ]
}"#;

/// PNG magic header, enough for MIME sniffing by extension
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

pub const INDEX_HTML: &str = "<!doctype html><title>Megabase</title>";

/// Game installation and build directory laid out in a temp dir.
pub struct GameFixture {
    pub dir: TempDir,
}

impl GameFixture {
    /// Full layout with stats, icons, favicon and a built app.
    pub fn new() -> Self {
        let fixture = Self::empty();
        fixture.write_stats(SAMPLE_STATS);
        fixture.write_file("data/base/graphics/technology/automation.png", PNG_BYTES);
        fixture.write_file("data/base/graphics/technology/worker-robot-speed.png", PNG_BYTES);
        fixture.write_file(
            "data/space-age/graphics/technology/foundry.png",
            PNG_BYTES,
        );
        fixture.write_file("data/core/graphics/factorio.png", PNG_BYTES);
        fixture.write_file("build/index.html", INDEX_HTML.as_bytes());
        fixture.write_file("build/_app/start.js", b"console.log('megabase');");
        fixture
    }

    /// No files at all.
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, relative: &str, content: &[u8]) {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn write_stats(&self, content: &str) {
        self.write_file("script-output/megabase-exporter/stats.json", content.as_bytes());
    }

    pub fn stats_path(&self) -> PathBuf {
        self.config().paths.stats_path()
    }

    pub fn config(&self) -> DashboardConfig {
        let mut config = DashboardConfig::default();
        config.paths.factorio_path = self.root().to_path_buf();
        config.paths.build_dir = self.root().join("build");
        config
    }
}

/// Router over the fixture, with the cache already loaded.
pub async fn create_test_app(fixture: &GameFixture) -> (axum::Router, Arc<StatsCache>) {
    let config = Arc::new(fixture.config());
    let cache = Arc::new(StatsCache::load(config.paths.stats_path()).await);
    let state = Arc::new(AppState::new(Arc::clone(&cache), config));
    (create_router(state), cache)
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}
