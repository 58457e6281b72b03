//! CLI module for the megabase dashboard
//!
//! # Commands
//!
//! - `serve` - Serve the stats file, game artwork and the dashboard app
//! - `watch` - Poll a running server and print summaries in the terminal
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Serve from a game installation
//! megabase serve --factorio-path ~/factorio
//!
//! # One-shot summary as JSON
//! megabase watch --once --json
//!
//! # Generate shell completions
//! megabase completions bash > ~/.bash_completion.d/megabase
//! ```

pub mod completions;
pub mod config;
pub mod output;
pub mod serve;
pub mod watch;

pub use completions::handle_completions;
pub use config::handle_config_init;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Megabase - live telemetry dashboard for a factory-simulation megabase
#[derive(Parser, Debug)]
#[command(
    name = "megabase",
    version,
    about = "Live telemetry dashboard for a factory-simulation megabase"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the dashboard server
    Serve(ServeArgs),
    /// Poll a dashboard server and print summaries
    Watch(WatchArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "megabase.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "MEGABASE_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "MEGABASE_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "MEGABASE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Root of the game installation
    #[arg(short, long, env = "FACTORIO_PATH")]
    pub factorio_path: Option<PathBuf>,

    /// Directory holding the built dashboard app
    #[arg(short, long)]
    pub build_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "megabase.toml")]
    pub config: PathBuf,

    /// Stats endpoint to poll (repeat to add fallbacks)
    #[arg(short, long = "url")]
    pub urls: Vec<String>,

    /// Poll interval in milliseconds
    #[arg(short, long, env = "MEGABASE_POLL_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Fetch once, print, and exit
    #[arg(long)]
    pub once: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "megabase.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["megabase", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.config, PathBuf::from("megabase.toml"));
                assert!(args.build_dir.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_serve_with_paths() {
        let cli = Cli::try_parse_from([
            "megabase",
            "serve",
            "-p",
            "9000",
            "--factorio-path",
            "/opt/factorio",
            "--build-dir",
            "dist",
        ])
        .unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.port, Some(9000));
                assert_eq!(args.factorio_path, Some(PathBuf::from("/opt/factorio")));
                assert_eq!(args.build_dir, Some(PathBuf::from("dist")));
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_watch_repeated_urls() {
        let cli = Cli::try_parse_from([
            "megabase",
            "watch",
            "--url",
            "http://a:3000/api/stats",
            "--url",
            "http://b:3000/api/stats",
            "--once",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.urls.len(), 2);
                assert!(args.once);
                assert!(args.json);
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_cli_parse_config_init() {
        let cli = Cli::try_parse_from(["megabase", "config", "init", "--force"]).unwrap();
        match cli.command {
            Commands::Config(ConfigCommands::Init(args)) => {
                assert!(args.force);
                assert_eq!(args.output, PathBuf::from("megabase.toml"));
            }
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_shell() {
        assert!(Cli::try_parse_from(["megabase", "completions", "tcsh"]).is_err());
    }
}
