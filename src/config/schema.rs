//! Configuration schema for privrel
//!
//! Configuration is stored at `~/.config/privrel/config.toml`

use crate::credentials::CredentialReference;
use crate::error::{PrivrelError, PrivrelResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variables that override file settings
pub mod env {
    pub const TOKEN_REFERENCE: &str = "PRIVREL_TOKEN_REFERENCE";
    pub const CACHE_DAYS: &str = "PRIVREL_CACHE_DAYS";
    pub const FORCE_REFRESH: &str = "PRIVREL_FORCE_REFRESH";
    pub const ACCOUNT: &str = "PRIVREL_ACCOUNT";
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Credential backend settings
    pub credentials: CredentialsConfig,

    /// Version cache settings
    pub cache: CacheConfig,

    /// Release registry settings
    pub registry: RegistryConfig,

    /// External installer settings
    pub installer: InstallerConfig,
}

impl Config {
    /// Apply `PRIVREL_*` overrides using `lookup` to read variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(reference) = lookup(env::TOKEN_REFERENCE) {
            self.credentials.token_reference = Some(reference);
        }

        if let Some(account) = lookup(env::ACCOUNT) {
            self.credentials.account = Some(account);
        }

        if let Some(days) = lookup(env::CACHE_DAYS) {
            self.cache.days = days
                .trim()
                .parse()
                .map_err(|_| format!("{} must be a non-negative integer, got {:?}", env::CACHE_DAYS, days))?;
        }

        if let Some(force) = lookup(env::FORCE_REFRESH) {
            self.cache.force_refresh = parse_bool(&force)
                .ok_or_else(|| format!("{} must be a boolean, got {:?}", env::FORCE_REFRESH, force))?;
        }

        Ok(())
    }

    /// The configured token reference, or `Configuration` if unset
    pub fn require_reference(&self) -> PrivrelResult<CredentialReference> {
        let locator = self
            .credentials
            .token_reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(PrivrelError::Configuration {
                field: "token_reference",
            })?;

        let account = self
            .credentials
            .account
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        Ok(CredentialReference::new(locator, account))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Credential backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Secret reference holding the registry token (e.g. `op://Private/GitHub/token`)
    pub token_reference: Option<String>,

    /// 1Password account override
    pub account: Option<String>,

    /// op executable
    pub program: String,

    /// Tokens shorter than this are rejected
    pub min_token_length: usize,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            token_reference: None,
            account: None,
            program: "op".to_string(),
            min_token_length: 10,
        }
    }
}

/// Version cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Days a cached version list stays fresh (0 = always refresh)
    pub days: u32,

    /// Drop the cached list before every lookup
    pub force_refresh: bool,

    /// Cache directory (defaults to the platform cache dir)
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            days: 7,
            force_refresh: false,
            dir: None,
        }
    }
}

/// Release registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// GitHub API base URL (for GitHub Enterprise)
    pub api_url: String,

    /// Releases per page
    pub per_page: u32,

    /// Maximum pages to walk
    pub max_pages: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            per_page: 100,
            max_pages: 10,
            timeout_secs: 30,
        }
    }
}

/// External installer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Installer executable
    pub program: String,

    /// Directory under the install path that receives binaries
    pub bin_dir: String,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            program: "ubi".to_string(),
            bin_dir: "bin".to_string(),
        }
    }
}
