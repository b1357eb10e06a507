//! 1Password credential provider using the op CLI

use super::{validate_token, Availability, CredentialProvider, CredentialReference, Token};
use crate::config::schema::CredentialsConfig;
use crate::error::{PrivrelError, PrivrelResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

const SERVICE_ACCOUNT_ENV: &str = "OP_SERVICE_ACCOUNT_TOKEN";

/// Failure reported by the op CLI, classified from its stderr.
///
/// op exposes no structured error channel, so this is the single place
/// where its messages are matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OpFailure {
    Unauthenticated,
    NotFound,
    Unavailable(String),
}

impl OpFailure {
    pub(crate) fn classify(stderr: &str) -> Self {
        const UNAUTHENTICATED: &[&str] = &[
            "not currently signed in",
            "not signed in",
            "session expired",
            "authorization prompt dismissed",
            "no accounts configured",
            "account is not signed in",
            "unauthorized",
            "invalid service account token",
        ];
        const NOT_FOUND: &[&str] = &[
            "isn't an item",
            "isn't a vault",
            "isn't a field",
            "could not find item",
            "could not find vault",
            "no item found",
            "not found in vault",
            "invalid secret reference",
            "does not have a field",
        ];

        let lower = stderr.to_lowercase();
        if UNAUTHENTICATED.iter().any(|p| lower.contains(p)) {
            Self::Unauthenticated
        } else if NOT_FOUND.iter().any(|p| lower.contains(p)) {
            Self::NotFound
        } else {
            Self::Unavailable(last_line(stderr))
        }
    }

    fn into_error(self, reference: &CredentialReference) -> PrivrelError {
        match self {
            Self::Unauthenticated => PrivrelError::CredentialUnauthenticated {
                account: reference.account.clone(),
            },
            Self::NotFound => PrivrelError::CredentialNotFound {
                reference: reference.to_string(),
            },
            Self::Unavailable(reason) => PrivrelError::CredentialUnavailable { reason },
        }
    }
}

/// Entry of `op account list --format json`
#[derive(Debug, Deserialize)]
struct OpAccount {
    #[serde(default)]
    url: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    account_uuid: String,
    #[serde(default)]
    user_uuid: String,
    #[serde(default)]
    shorthand: String,
}

impl OpAccount {
    fn matches(&self, account: &str) -> bool {
        [
            &self.url,
            &self.email,
            &self.account_uuid,
            &self.user_uuid,
            &self.shorthand,
        ]
        .iter()
        .any(|field| !field.is_empty() && field.eq_ignore_ascii_case(account))
    }
}

/// 1Password credential provider
#[derive(Debug, Clone)]
pub struct OnePasswordCli {
    program: String,
    min_token_length: usize,
    service_account: bool,
}

impl OnePasswordCli {
    /// Create a provider from credential settings
    pub fn new(config: &CredentialsConfig) -> Self {
        let service_account = std::env::var(SERVICE_ACCOUNT_ENV)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);

        Self {
            program: config.program.clone(),
            min_token_length: config.min_token_length,
            service_account,
        }
    }

    fn command(&self, account: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(account) = account {
            cmd.args(["--account", account]);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn spawn_failure(&self, e: std::io::Error) -> Availability {
        if e.kind() == ErrorKind::NotFound {
            Availability::NotInstalled {
                reason: format!("{} executable not found in PATH", self.program),
            }
        } else {
            Availability::Unreachable {
                reason: format!("failed to run {}: {}", self.program, e),
            }
        }
    }

    fn check_accounts(raw: &[u8], account: Option<&str>) -> Availability {
        let accounts: Vec<OpAccount> = match serde_json::from_slice(raw) {
            Ok(accounts) => accounts,
            Err(e) => {
                return Availability::Unreachable {
                    reason: format!("unexpected account list output: {}", e),
                }
            }
        };

        if accounts.is_empty() {
            return Availability::Unauthenticated {
                reason: "no 1Password accounts are configured".to_string(),
            };
        }

        match account {
            Some(wanted) if !accounts.iter().any(|a| a.matches(wanted)) => {
                Availability::Unauthenticated {
                    reason: format!("account {} is not configured", wanted),
                }
            }
            _ => Availability::Ready,
        }
    }
}

#[async_trait]
impl CredentialProvider for OnePasswordCli {
    fn name(&self) -> &'static str {
        "1password"
    }

    async fn is_available(&self, account: Option<&str>) -> Availability {
        let mut version = self.command(None);
        version.arg("--version");
        match version.output().await {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                return Availability::Unreachable {
                    reason: last_line(&String::from_utf8_lossy(&output.stderr)),
                }
            }
            Err(e) => return self.spawn_failure(e),
        }

        if self.service_account {
            debug!("Using 1Password service account from {}", SERVICE_ACCOUNT_ENV);
            return Availability::Ready;
        }

        let mut list = self.command(None);
        list.args(["account", "list", "--format", "json"]);
        let output = match list.output().await {
            Ok(output) => output,
            Err(e) => return self.spawn_failure(e),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return match OpFailure::classify(&stderr) {
                OpFailure::Unauthenticated => Availability::Unauthenticated {
                    reason: last_line(&stderr),
                },
                OpFailure::NotFound | OpFailure::Unavailable(_) => Availability::Unreachable {
                    reason: last_line(&stderr),
                },
            };
        }

        Self::check_accounts(&output.stdout, account)
    }

    async fn fetch_token(&self, reference: &CredentialReference) -> PrivrelResult<Token> {
        let account = reference.account.as_deref();
        if let Some(err) = self.is_available(account).await.into_error(account) {
            return Err(err);
        }

        debug!("Reading token from 1Password: {}", reference);

        let mut cmd = self.command(account);
        cmd.args(["read", "--no-newline", reference.locator.as_str()]);

        let output = cmd
            .output()
            .await
            .map_err(|e| PrivrelError::command_failed(format!("{} read", self.program), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OpFailure::classify(&stderr).into_error(reference));
        }

        let raw = String::from_utf8(output.stdout).map_err(|_| PrivrelError::CredentialInvalid {
            reference: reference.locator.clone(),
            reason: "value is not valid UTF-8".to_string(),
        })?;

        validate_token(reference, raw, self.min_token_length)
    }
}

fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .rev()
        .find(|l| !l.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}
