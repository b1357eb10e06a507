//! External binary installer (ubi)

use crate::config::schema::InstallerConfig;
use crate::credentials::Token;
use crate::error::{InstallAttempt, PrivrelError, PrivrelResult};
use crate::version::RepositoryId;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Variables copied from the invoking environment into the installer's
const PASSTHROUGH_ENV: &[&str] = &["HOME", "PATH", "USER"];

/// Variable carrying the registry token into the installer
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

const MAX_STDERR_CHARS: usize = 2000;

/// One installer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerInvocation {
    pub repo: RepositoryId,
    pub tag: String,
    pub destination: PathBuf,
}

/// How an installer run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Succeeded,
    Failed(InstallAttempt),
}

/// Installs release binaries into a directory
#[async_trait]
pub trait Installer: Send + Sync {
    /// Executable name, for error messages
    fn program(&self) -> &str;

    /// Whether the installer executable can be launched
    async fn is_available(&self) -> bool;

    /// Run the installer once. A non-zero exit is `InstallOutcome::Failed`,
    /// not an error.
    async fn run(
        &self,
        invocation: &InstallerInvocation,
        token: &Token,
    ) -> PrivrelResult<InstallOutcome>;
}

/// Installer backed by the `ubi` CLI
#[derive(Debug, Clone)]
pub struct UbiInstaller {
    program: String,
}

impl UbiInstaller {
    pub fn new(config: &InstallerConfig) -> Self {
        Self {
            program: config.program.clone(),
        }
    }

    /// Build the command with an explicit argument vector and a cleared
    /// environment holding only the token and the pass-through variables
    fn command<F>(&self, invocation: &InstallerInvocation, token: &Token, lookup: F) -> Command
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--project")
            .arg(invocation.repo.to_string())
            .arg("--tag")
            .arg(&invocation.tag)
            .arg("--in")
            .arg(&invocation.destination);

        cmd.env_clear();
        for key in PASSTHROUGH_ENV {
            if let Some(value) = lookup(key) {
                cmd.env(key, value);
            }
        }
        cmd.env(TOKEN_ENV, token.expose());

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl Installer for UbiInstaller {
    fn program(&self) -> &str {
        &self.program
    }

    async fn is_available(&self) -> bool {
        let result = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                debug!("{} is not runnable: {}", self.program, e);
                false
            }
        }
    }

    async fn run(
        &self,
        invocation: &InstallerInvocation,
        token: &Token,
    ) -> PrivrelResult<InstallOutcome> {
        debug!(
            "Running {} for {} at tag {}",
            self.program, invocation.repo, invocation.tag
        );

        let output = self
            .command(invocation, token, |key| std::env::var(key).ok())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    PrivrelError::InstallerMissing {
                        program: self.program.clone(),
                    }
                } else {
                    PrivrelError::command_failed(&self.program, e)
                }
            })?;

        if output.status.success() {
            return Ok(InstallOutcome::Succeeded);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(InstallOutcome::Failed(InstallAttempt {
            tag: invocation.tag.clone(),
            exit_code: output.status.code(),
            stderr: tail(stderr.trim(), MAX_STDERR_CHARS),
        }))
    }
}

/// Last `max` characters of `s`
fn tail(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        s.to_string()
    } else {
        s.chars().skip(count - max).collect()
    }
}
