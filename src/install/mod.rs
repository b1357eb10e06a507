//! Installation of a resolved release
//!
//! Every install fetches its own token; tokens are never shared with the
//! resolver or kept between runs. The installer is tried with the `v`-prefixed
//! tag first and the bare version second.

pub mod installer;

pub use installer::{InstallOutcome, Installer, InstallerInvocation, UbiInstaller};

use crate::credentials::{CredentialProvider, CredentialReference};
use crate::error::{PrivrelError, PrivrelResult};
use crate::version::{normalize, RepositoryId};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

/// What to install and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRequest {
    pub repo: RepositoryId,
    pub version: String,
    pub install_path: PathBuf,
}

/// A completed installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationResult {
    /// Tag the installer accepted
    pub tag: String,
    /// Directory holding the binaries
    pub bin_dir: PathBuf,
    /// Files the accepted run created or rewrote in `bin_dir`, sorted
    pub binaries: Vec<PathBuf>,
}

/// Tags to try for `version`, in order
pub fn candidate_tags(version: &str) -> [String; 2] {
    let version = normalize(version);
    [format!("v{}", version), version.to_string()]
}

/// Binaries directory under an install path
pub fn bin_dir(install_path: &Path, bin_dir: &str) -> PathBuf {
    install_path.join(bin_dir)
}

/// Drives the external installer for one request
pub struct InstallOrchestrator<'a> {
    credentials: &'a dyn CredentialProvider,
    installer: &'a dyn Installer,
    reference: CredentialReference,
    bin_dir: String,
}

impl<'a> InstallOrchestrator<'a> {
    pub fn new(
        credentials: &'a dyn CredentialProvider,
        installer: &'a dyn Installer,
        reference: CredentialReference,
        bin_dir: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            installer,
            reference,
            bin_dir: bin_dir.into(),
        }
    }

    pub async fn install(&self, request: &InstallationRequest) -> PrivrelResult<InstallationResult> {
        if !self.installer.is_available().await {
            return Err(PrivrelError::InstallerMissing {
                program: self.installer.program().to_string(),
            });
        }

        let token = self.credentials.fetch_token(&self.reference).await?;

        let destination = bin_dir(&request.install_path, &self.bin_dir);
        tokio::fs::create_dir_all(&destination).await.map_err(|e| {
            PrivrelError::io(format!("creating {}", destination.display()), e)
        })?;

        let mut attempts = Vec::new();
        for tag in candidate_tags(&request.version) {
            let invocation = InstallerInvocation {
                repo: request.repo.clone(),
                tag,
                destination: destination.clone(),
            };

            let before = scan(&destination).await?;
            match self.installer.run(&invocation, &token).await? {
                InstallOutcome::Succeeded => {
                    let binaries = produced_since(&before, scan(&destination).await?);
                    if binaries.is_empty() {
                        return Err(PrivrelError::NoBinariesProduced {
                            repo: request.repo.to_string(),
                            tag: invocation.tag,
                            dir: destination,
                        });
                    }

                    info!(
                        "Installed {} {} ({} binaries)",
                        request.repo,
                        invocation.tag,
                        binaries.len()
                    );
                    return Ok(InstallationResult {
                        tag: invocation.tag,
                        bin_dir: destination,
                        binaries,
                    });
                }
                InstallOutcome::Failed(attempt) => {
                    warn!(
                        "{} failed for {} at tag {}",
                        self.installer.program(),
                        request.repo,
                        attempt.tag
                    );
                    attempts.push(attempt);
                }
            }
        }

        Err(PrivrelError::InstallerFailed {
            repo: request.repo.to_string(),
            attempts,
        })
    }
}

/// Size and modification time of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

/// Files in `dir` with their stamps; a missing directory is empty
async fn scan(dir: &Path) -> PrivrelResult<BTreeMap<PathBuf, FileStamp>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(PrivrelError::io(format!("reading {}", dir.display()), e)),
    };

    let mut files = BTreeMap::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PrivrelError::io(format!("reading {}", dir.display()), e))?
    {
        let metadata = entry
            .metadata()
            .await
            .map_err(|e| PrivrelError::io(format!("inspecting {}", entry.path().display()), e))?;
        if metadata.is_file() || metadata.is_symlink() {
            let stamp = FileStamp {
                len: metadata.len(),
                modified: metadata.modified().ok(),
            };
            files.insert(entry.path(), stamp);
        }
    }

    Ok(files)
}

/// Entries of `after` that are new or changed relative to `before`, sorted
fn produced_since(
    before: &BTreeMap<PathBuf, FileStamp>,
    after: BTreeMap<PathBuf, FileStamp>,
) -> Vec<PathBuf> {
    after
        .into_iter()
        .filter(|(path, stamp)| before.get(path) != Some(stamp))
        .map(|(path, _)| path)
        .collect()
}
