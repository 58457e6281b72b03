//! Watch command implementation
//!
//! A terminal front-end for [`StatsClient`]: polls the dashboard server and
//! prints a summary after every poll.

use crate::cli::output::{format_report, format_report_json, WatchReport};
use crate::cli::serve::{init_tracing, load_config, shutdown_signal};
use crate::cli::WatchArgs;
use crate::client::{ClientConfig, ClientEvent, StatsClient};
use crate::config::DashboardConfig;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &WatchArgs,
) -> Result<DashboardConfig, Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;

    if !args.urls.is_empty() {
        config.client.endpoints = args.urls.clone();
    }
    if let Some(interval_ms) = args.interval_ms {
        config.client.poll_interval_ms = interval_ms;
    }

    Ok(config)
}

fn print_report(client: &StatsClient, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let report = WatchReport::from_client(client);
    if json {
        println!("{}", format_report_json(&report)?);
    } else {
        let now = chrono::Utc::now().timestamp_millis();
        println!("{}", format_report(&report, now));
    }
    Ok(())
}

/// Fetch once and print. Fails if every endpoint fails.
pub async fn run_once(
    config: ClientConfig,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = StatsClient::new(config);
    client.refresh().await?;
    print_report(&client, json)
}

/// Main watch command handler
pub async fn run_watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config_with_overrides(&args)?;
    // Keep the terminal for the report unless asked otherwise
    if std::env::var("MEGABASE_LOG_LEVEL").is_err() {
        config.logging.level = "warn".to_string();
    }
    config.validate()?;
    init_tracing(&config.logging)?;

    if args.once {
        return run_once(config.client, args.json).await;
    }

    let client = Arc::new(StatsClient::new(config.client));
    let mut events = client.subscribe();
    let cancel_token = CancellationToken::new();
    let poller = Arc::clone(&client).start(client.poll_interval(), cancel_token.clone());

    let shutdown = shutdown_signal(cancel_token.clone());
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Ok(ClientEvent::Updated { .. }) => print_report(&client, args.json)?,
                Ok(ClientEvent::Failed { sequence, error }) => {
                    tracing::debug!(sequence, "Poll failed");
                    if args.json {
                        println!("{}", serde_json::json!({ "error": error }));
                    } else {
                        eprintln!("Poll failed: {}", error);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Report output fell behind");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    cancel_token.cancel();
    poller.await?;
    Ok(())
}
