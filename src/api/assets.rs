//! Game artwork and single-page app file serving.

use crate::api::AppState;
use crate::config::PathsConfig;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::io;
use std::path::{Component, PathBuf};
use std::sync::Arc;

const LONG_CACHE: &str = "public, max-age=86400";

/// Resolved asset locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    /// Searched in order
    pub technology_dirs: Vec<PathBuf>,
    pub favicon: PathBuf,
    pub build_dir: PathBuf,
}

impl AssetPaths {
    pub fn from_config(paths: &PathsConfig) -> Self {
        Self {
            technology_dirs: paths.technology_dirs(),
            favicon: paths.favicon_path(),
            build_dir: paths.build_dir.clone(),
        }
    }
}

/// GET /favicon.png
pub async fn favicon(State(state): State<Arc<AppState>>) -> Response {
    match read_file(&state.assets.favicon).await {
        Ok(Some(body)) => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, LONG_CACHE),
            ],
            body,
        )
            .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Favicon not found").into_response(),
        Err(e) => {
            tracing::error!(path = %state.assets.favicon.display(), error = %e, "Failed to read favicon");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// GET /api/assets/technology/:name
///
/// Tries the exact name in every technology directory, then the name with
/// a trailing level number removed (`mining-productivity-3.png` shares
/// `mining-productivity.png`).
pub async fn technology(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    if !is_plain_file_name(&name) {
        tracing::debug!(name = %name, "Rejected technology asset name");
        return asset_not_found();
    }

    let mut candidates = vec![name.clone()];
    if let Some(base) = strip_level_suffix(&name) {
        candidates.push(base);
    }

    for candidate in &candidates {
        for dir in &state.assets.technology_dirs {
            let path = dir.join(candidate);
            match read_file(&path).await {
                Ok(Some(body)) => {
                    metrics::counter!(
                        "megabase_asset_requests_total",
                        "kind" => "technology",
                        "result" => "found"
                    )
                    .increment(1);
                    let mime = mime_guess::from_path(candidate).first_or_octet_stream();
                    return (
                        [
                            (header::CONTENT_TYPE, mime.as_ref()),
                            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
                            (header::CACHE_CONTROL, LONG_CACHE),
                        ],
                        body,
                    )
                        .into_response();
                }
                Ok(None) => {
                    tracing::debug!(name = %name, path = %path.display(), "Technology asset not found");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read technology asset");
                }
            }
        }
    }

    asset_not_found()
}

fn asset_not_found() -> Response {
    metrics::counter!(
        "megabase_asset_requests_total",
        "kind" => "technology",
        "result" => "missing"
    )
    .increment(1);
    (StatusCode::NOT_FOUND, "Asset not found").into_response()
}

/// Fallback: serve a file from the build directory, else `index.html`.
pub async fn build_file(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let build_dir = &state.assets.build_dir;

    let requested = match relative_build_path(uri.path()) {
        Some(relative) => read_file(&build_dir.join(&relative))
            .await
            .map(|body| body.map(|body| (relative, body))),
        None => Ok(None),
    };

    let found = match requested {
        Ok(None) => read_file(&build_dir.join("index.html"))
            .await
            .map(|body| body.map(|body| (PathBuf::from("index.html"), body))),
        other => other,
    };

    match found {
        Ok(Some((path, body))) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], body).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        Err(e) => {
            tracing::error!(uri = %uri, error = %e, "Error serving file");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Read a regular file. Missing files and directories are `Ok(None)`.
async fn read_file(path: &std::path::Path) -> io::Result<Option<Vec<u8>>> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => tokio::fs::read(path).await.map(Some),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
}

/// `worker-robot-speed-7.png` -> `worker-robot-speed.png`
fn strip_level_suffix(name: &str) -> Option<String> {
    let stem = name.strip_suffix(".png")?;
    let (base, level) = stem.rsplit_once('-')?;

    if base.is_empty() || level.is_empty() || !level.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}.png", base))
}

/// Map a request path to a path inside the build directory.
///
/// Returns `None` for anything that would escape it.
fn relative_build_path(uri_path: &str) -> Option<PathBuf> {
    let trimmed = uri_path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Some(PathBuf::from("index.html"));
    }

    let relative = PathBuf::from(trimmed);
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then_some(relative)
}
