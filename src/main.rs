//! privrel - private release version resolver and installer
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use privrel::cli::{Cli, Commands, LogFormat};
use privrel::config::ConfigManager;
use privrel::error::PrivrelResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PrivrelResult<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug; stdout is reserved for responses
    let filter = match cli.verbose {
        0 => EnvFilter::new("privrel=warn"),
        1 => EnvFilter::new("privrel=info"),
        _ => EnvFilter::new("privrel=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();
    match cli.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    let config = config_manager.load_with_env().await?;

    match cli.command {
        Commands::ListVersions(args) => privrel::cli::commands::list_versions(args, &config).await,
        Commands::Install(args) => privrel::cli::commands::install(args, &config).await,
        Commands::ExecEnv(args) => privrel::cli::commands::exec_env(args, &config),
        Commands::Cache(args) => privrel::cli::commands::cache(args, &config).await,
        Commands::Status => privrel::cli::commands::status(&config).await,
        Commands::Config(args) => {
            privrel::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
