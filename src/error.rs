//! Error types for privrel
//!
//! All modules use `PrivrelResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for privrel operations
pub type PrivrelResult<T> = Result<T, PrivrelError>;

/// One installer invocation, kept for diagnostics when every tag convention fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallAttempt {
    /// Tag passed to the installer
    pub tag: String,
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    /// Captured stderr (trimmed)
    pub stderr: String,
}

/// All errors that can occur in privrel
#[derive(Error, Debug)]
pub enum PrivrelError {
    // Configuration errors
    #[error("Configuration error: {field} is required")]
    Configuration { field: &'static str },

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid repository identifier '{0}', expected owner/name")]
    InvalidRepository(String),

    // Credential errors
    #[error("Credential backend unavailable: {reason}")]
    CredentialUnavailable { reason: String },

    #[error("Credential backend is not signed in{}", account_suffix(.account))]
    CredentialUnauthenticated { account: Option<String> },

    #[error("Credential reference not found: {reference}")]
    CredentialNotFound { reference: String },

    #[error("Credential at {reference} is invalid: {reason}")]
    CredentialInvalid { reference: String, reason: String },

    // Registry errors
    #[error("Rate limited by release registry while listing {repo}{}", reset_suffix(.reset_at))]
    RemoteRateLimited { repo: String, reset_at: Option<i64> },

    #[error("Release registry rejected credentials for {repo} (HTTP {status})")]
    RemoteAuthFailed { repo: String, status: u16 },

    #[error("{}", not_found_message(.repo, .version))]
    RemoteNotFound {
        repo: String,
        version: Option<String>,
    },

    #[error("Malformed release listing for {repo}: {reason}")]
    RemoteMalformed { repo: String, reason: String },

    #[error("Could not reach release registry for {repo}: {reason}")]
    RemoteTransport { repo: String, reason: String },

    #[error("No versions found for {repo}")]
    NoVersionsFound { repo: String },

    // Cache errors (never surfaced past the cache store)
    #[error("Cache entry for {repo} is unusable: {reason}")]
    CacheCorrupt { repo: String, reason: String },

    // Install errors
    #[error("Installer not found: {program}")]
    InstallerMissing { program: String },

    #[error("Installer failed for {repo}: {}", summarize_attempts(.attempts))]
    InstallerFailed {
        repo: String,
        attempts: Vec<InstallAttempt>,
    },

    #[error("Installer reported success for {repo} at tag {tag}, but {dir} contains no binaries")]
    NoBinariesProduced {
        repo: String,
        tag: String,
        dir: PathBuf,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn account_suffix(account: &Option<String>) -> String {
    account
        .as_ref()
        .map(|a| format!(" (account {})", a))
        .unwrap_or_default()
}

fn reset_suffix(reset_at: &Option<i64>) -> String {
    reset_at
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .map(|dt| format!(", resets at {}", dt.to_rfc3339()))
        .unwrap_or_default()
}

fn not_found_message(repo: &str, version: &Option<String>) -> String {
    match version {
        Some(v) => format!("Version {} not found in releases of {}", v, repo),
        None => format!("Repository not found or not accessible: {}", repo),
    }
}

fn summarize_attempts(attempts: &[InstallAttempt]) -> String {
    attempts
        .iter()
        .map(|a| {
            let code = a
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            if a.stderr.is_empty() {
                format!("[tag {}: exit {}]", a.tag, code)
            } else {
                format!("[tag {}: exit {}: {}]", a.tag, code, a.stderr)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl PrivrelError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Configuration { .. } => Some(
                "Set credentials.token_reference in config.toml or PRIVREL_TOKEN_REFERENCE",
            ),
            Self::CredentialUnavailable { .. } => {
                Some("Install the 1Password CLI: https://developer.1password.com/docs/cli")
            }
            Self::CredentialUnauthenticated { .. } => Some("Run: op signin"),
            Self::CredentialNotFound { .. } => {
                Some("Check the op:// reference path and the selected account")
            }
            Self::RemoteRateLimited { .. } => {
                Some("Wait for the rate limit window to reset, or avoid --force-refresh")
            }
            Self::RemoteAuthFailed { .. } => {
                Some("The stored token may be expired or lack the repo scope")
            }
            Self::InstallerMissing { .. } => {
                Some("Install ubi: https://github.com/houseabsolute/ubi")
            }
            _ => None,
        }
    }
}
