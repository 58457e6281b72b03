//! Serve command implementation

use crate::api::{create_router, AppState};
use crate::cache::StatsCache;
use crate::cli::ServeArgs;
use crate::config::{DashboardConfig, LogFormat};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Load a config file if present, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<DashboardConfig, Box<dyn std::error::Error>> {
    let config = if path.exists() {
        DashboardConfig::load(Some(path))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        DashboardConfig::default()
    };

    Ok(config.with_env_overrides())
}

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &ServeArgs,
) -> Result<DashboardConfig, Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;

    // CLI overrides (highest priority)
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }
    if let Some(ref factorio_path) = args.factorio_path {
        config.paths.factorio_path = factorio_path.clone();
    }
    if let Some(ref build_dir) = args.build_dir {
        config.paths.build_dir = build_dir.clone();
    }

    Ok(config)
}

/// Initialize tracing based on configuration
///
/// `RUST_LOG` takes precedence over the configured levels. Output goes to
/// stderr so `watch` can keep stdout for its report.
pub fn init_tracing(
    config: &crate::config::LoggingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(config.ansi),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
pub async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
        _ = cancel_token.cancelled() => {}
    }

    cancel_token.cancel();
}

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load and merge configuration
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    // 2. Initialize tracing
    init_tracing(&config.logging)?;

    tracing::info!("Starting megabase dashboard server");
    tracing::debug!(?config, "Loaded configuration");

    // 3. Initial load, then watch for changes
    let stats_path = config.paths.stats_path();
    let cache = Arc::new(StatsCache::load(&stats_path).await);
    let cancel_token = CancellationToken::new();
    let watch_handle = match Arc::clone(&cache).watch(cancel_token.clone()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::error!(error = %e, "Stats file watcher disabled, serving initial load only");
            None
        }
    };

    // 4. Build router
    let config = Arc::new(config);
    let app = create_router(Arc::new(AppState::new(cache, Arc::clone(&config))));

    // 5. Bind and serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        addr = %addr,
        stats = %stats_path.display(),
        build_dir = %config.paths.build_dir.display(),
        factorio_path = %config.paths.factorio_path.display(),
        "Dashboard server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await?;

    // 6. Cleanup
    cancel_token.cancel();
    if let Some(handle) = watch_handle {
        tracing::info!("Waiting for stats watcher to stop");
        handle.await?;
    }

    tracing::info!("Dashboard server stopped");
    Ok(())
}
