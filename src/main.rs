use clap::Parser;
use megabase::cli::{handle_completions, handle_config_init, Cli, Commands, ConfigCommands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => megabase::cli::serve::run_serve(args).await,
        Commands::Watch(args) => megabase::cli::watch::run_watch(args).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
