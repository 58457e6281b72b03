//! Filesystem locations for the stats file and game assets

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem layout, relative to the game installation.
///
/// `stats_file` is resolved against `factorio_path` unless absolute.
/// `build_dir` is resolved against the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the game installation (also holds `script-output/`)
    pub factorio_path: PathBuf,
    pub stats_file: PathBuf,
    /// Pre-built single-page app
    pub build_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            factorio_path: PathBuf::from("."),
            stats_file: PathBuf::from("script-output/megabase-exporter/stats.json"),
            build_dir: PathBuf::from("build"),
        }
    }
}

impl PathsConfig {
    pub fn stats_path(&self) -> PathBuf {
        self.factorio_path.join(&self.stats_file)
    }

    /// Technology icon directories, searched in order.
    pub fn technology_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.factorio_path.join("data/base/graphics/technology"),
            self.factorio_path.join("data/space-age/graphics/technology"),
        ]
    }

    pub fn favicon_path(&self) -> PathBuf {
        self.factorio_path.join("data/core/graphics/factorio.png")
    }
}
