//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// privrel - versions and installs of privately released tools
///
/// Lists release versions through a local cache and installs release
/// binaries, fetching registry tokens from 1Password only when needed.
#[derive(Parser, Debug)]
#[command(name = "privrel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PRIVREL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List installable versions of a repository
    ListVersions(ListVersionsArgs),

    /// Install a release into a directory
    Install(InstallArgs),

    /// Print environment variables for an installation
    ExecEnv(ExecEnvArgs),

    /// Inspect or clear the version cache
    Cache(CacheArgs),

    /// Check credential backend and installer availability
    Status,

    /// Show configuration
    Config(ConfigArgs),
}

/// Arguments for the list-versions command
#[derive(Parser, Debug)]
pub struct ListVersionsArgs {
    /// Repository as owner/name
    pub repo: String,

    /// Version that must be present in the result
    #[arg(long = "version", value_name = "VERSION")]
    pub requested_version: Option<String>,

    /// Ignore the cache and query the registry
    #[arg(long)]
    pub force_refresh: bool,
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Repository as owner/name
    pub repo: String,

    /// Version to install (with or without a leading v)
    pub version: String,

    /// Installation root; binaries land in its bin directory
    pub install_path: PathBuf,
}

/// Arguments for the exec-env command
#[derive(Parser, Debug)]
pub struct ExecEnvArgs {
    /// Installation root
    pub install_path: PathBuf,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show the cached versions of a repository
    Show {
        /// Repository as owner/name
        repo: String,
    },

    /// Remove cached versions
    Clear {
        /// Repository as owner/name
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        repo: Option<String>,

        /// Clear every repository
        #[arg(long)]
        all: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}
