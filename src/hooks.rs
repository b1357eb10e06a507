//! Host-facing entry points
//!
//! Request and response types use camelCase field names on the wire.

use crate::cache::VersionCache;
use crate::config::{Config, ConfigManager};
use crate::credentials::onepassword::OnePasswordCli;
use crate::credentials::CredentialProvider;
use crate::error::PrivrelResult;
use crate::install::{self, InstallOrchestrator, InstallationRequest, Installer, UbiInstaller};
use crate::registry::{GithubReleases, ReleaseRegistry};
use crate::resolver::{ResolveOptions, Resolver};
use crate::version::RepositoryId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Path-extension variable exported for installed binaries
pub const PATH_VAR: &str = "PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVersionsRequest {
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListVersionsResponse {
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRequest {
    pub repo: String,
    pub version: String,
    pub install_path: PathBuf,
}

/// Empty on success; failures are reported as errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallResponse {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecEnvRequest {
    pub install_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecEnvResponse {
    pub env_vars: Vec<EnvVar>,
}

/// Wires configuration, cache and collaborators behind the three entry points
pub struct Hooks {
    config: Config,
    cache: VersionCache,
    credentials: Box<dyn CredentialProvider>,
    registry: Box<dyn ReleaseRegistry>,
    installer: Box<dyn Installer>,
}

impl Hooks {
    /// Production wiring: 1Password CLI, GitHub releases, ubi
    pub fn from_config(config: Config) -> Self {
        let cache = VersionCache::new(ConfigManager::cache_dir(&config));
        let credentials = Box::new(OnePasswordCli::new(&config.credentials));
        let registry = Box::new(GithubReleases::new(&config.registry));
        let installer = Box::new(UbiInstaller::new(&config.installer));
        Self::with_collaborators(config, cache, credentials, registry, installer)
    }

    pub fn with_collaborators(
        config: Config,
        cache: VersionCache,
        credentials: Box<dyn CredentialProvider>,
        registry: Box<dyn ReleaseRegistry>,
        installer: Box<dyn Installer>,
    ) -> Self {
        Self {
            config,
            cache,
            credentials,
            registry,
            installer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &VersionCache {
        &self.cache
    }

    pub fn credentials(&self) -> &dyn CredentialProvider {
        self.credentials.as_ref()
    }

    pub fn installer(&self) -> &dyn Installer {
        self.installer.as_ref()
    }

    pub async fn list_versions(
        &self,
        request: &ListVersionsRequest,
    ) -> PrivrelResult<ListVersionsResponse> {
        let repo = RepositoryId::parse(&request.repo)?;
        let reference = self.config.require_reference()?;

        let resolver = Resolver::new(
            &self.cache,
            self.credentials.as_ref(),
            self.registry.as_ref(),
            reference,
            ResolveOptions::from(&self.config.cache),
        );
        let resolution = resolver
            .resolve(&repo, request.requested_version.as_deref())
            .await?;

        Ok(ListVersionsResponse {
            versions: resolution.versions.into(),
        })
    }

    pub async fn install(&self, request: &InstallRequest) -> PrivrelResult<InstallResponse> {
        let repo = RepositoryId::parse(&request.repo)?;
        let reference = self.config.require_reference()?;

        let orchestrator = InstallOrchestrator::new(
            self.credentials.as_ref(),
            self.installer.as_ref(),
            reference,
            self.config.installer.bin_dir.as_str(),
        );
        orchestrator
            .install(&InstallationRequest {
                repo,
                version: request.version.clone(),
                install_path: request.install_path.clone(),
            })
            .await?;

        Ok(InstallResponse {})
    }

    pub fn exec_env(&self, request: &ExecEnvRequest) -> ExecEnvResponse {
        exec_env(request, &self.config.installer.bin_dir)
    }
}

/// Expose `<install_path>/<bin_dir>` as a path extension
pub fn exec_env(request: &ExecEnvRequest, bin_dir: &str) -> ExecEnvResponse {
    let dir = install::bin_dir(&request.install_path, bin_dir);
    ExecEnvResponse {
        env_vars: vec![EnvVar {
            key: PATH_VAR.to_string(),
            value: dir.to_string_lossy().into_owned(),
        }],
    }
}
