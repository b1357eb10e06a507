//! GitHub Releases registry

use super::{ReleaseListing, ReleaseRegistry};
use crate::config::schema::RegistryConfig;
use crate::credentials::Token;
use crate::error::{PrivrelError, PrivrelResult};
use crate::version::{RepositoryId, VersionList};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("privrel/", env!("CARGO_PKG_VERSION"));

/// Release entry from the GitHub API
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    draft: bool,
}

/// Release registry backed by the GitHub REST API
#[derive(Clone)]
pub struct GithubReleases {
    agent: ureq::Agent,
    api_url: String,
    per_page: u32,
    max_pages: u32,
}

impl GithubReleases {
    /// Create a registry client from settings
    pub fn new(config: &RegistryConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Self {
            agent,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            per_page: config.per_page.clamp(1, 100),
            max_pages: config.max_pages.max(1),
        }
    }

    fn releases_url(&self, repo: &RepositoryId) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.api_url,
            repo.owner(),
            repo.name()
        )
    }

    /// Walk the paged listing, returning tags of published releases and
    /// whether the page limit cut the listing short
    fn fetch_tags_blocking(
        &self,
        repo: &RepositoryId,
        auth: &SecretString,
    ) -> PrivrelResult<(Vec<String>, bool)> {
        let mut tags = Vec::new();

        for page in 1..=self.max_pages {
            let releases = self.fetch_page(repo, auth, page)?;
            let count = releases.len();

            tags.extend(
                releases
                    .into_iter()
                    .filter(|r| !r.draft)
                    .map(|r| r.tag_name),
            );

            if count < self.per_page as usize {
                return Ok((tags, false));
            }
        }

        warn!(
            "Stopped listing releases of {} after {} pages",
            repo, self.max_pages
        );
        Ok((tags, true))
    }

    fn fetch_page(
        &self,
        repo: &RepositoryId,
        auth: &SecretString,
        page: u32,
    ) -> PrivrelResult<Vec<Release>> {
        let url = self.releases_url(repo);
        debug!("Fetching {} (page {})", url, page);

        let transport = |reason: String| PrivrelError::RemoteTransport {
            repo: repo.to_string(),
            reason,
        };

        let mut response = self
            .agent
            .get(&url)
            .query("per_page", self.per_page.to_string())
            .query("page", page.to_string())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", USER_AGENT)
            .header("Authorization", auth.expose_secret())
            .call()
            .map_err(|e| transport(e.to_string()))?;

        let status = response.status().as_u16();
        let header_num = |name: &str| -> Option<i64> {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        };
        let rate = RateLimit {
            remaining: header_num("x-ratelimit-remaining"),
            reset_at: header_num("x-ratelimit-reset"),
        };

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| transport(format!("reading response body: {}", e)))?;

        if let Some(err) = classify_status(repo, status, &rate, &body) {
            return Err(err);
        }

        parse_page(repo, &body)
    }
}

/// Rate limit headers of a response
#[derive(Debug, Default, Clone, Copy)]
struct RateLimit {
    remaining: Option<i64>,
    reset_at: Option<i64>,
}

/// Map a non-success response to its error, `None` for 2xx
fn classify_status(
    repo: &RepositoryId,
    status: u16,
    rate: &RateLimit,
    body: &str,
) -> Option<PrivrelError> {
    let repo_name = repo.to_string();
    let rate_limited = || PrivrelError::RemoteRateLimited {
        repo: repo_name.clone(),
        reset_at: rate.reset_at,
    };

    match status {
        200..=299 => None,
        401 => Some(PrivrelError::RemoteAuthFailed {
            repo: repo_name.clone(),
            status,
        }),
        403 if rate.remaining == Some(0) || body.to_lowercase().contains("rate limit") => {
            Some(rate_limited())
        }
        403 => Some(PrivrelError::RemoteAuthFailed {
            repo: repo_name.clone(),
            status,
        }),
        429 => Some(rate_limited()),
        404 => Some(PrivrelError::RemoteNotFound {
            repo: repo_name.clone(),
            version: None,
        }),
        _ => Some(PrivrelError::RemoteTransport {
            repo: repo_name.clone(),
            reason: format!("HTTP {}", status),
        }),
    }
}

fn parse_page(repo: &RepositoryId, body: &str) -> PrivrelResult<Vec<Release>> {
    serde_json::from_str(body).map_err(|e| PrivrelError::RemoteMalformed {
        repo: repo.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl ReleaseRegistry for GithubReleases {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn fetch_versions(
        &self,
        repo: &RepositoryId,
        token: &Token,
    ) -> PrivrelResult<ReleaseListing> {
        info!("Listing releases of {}", repo);

        let auth = SecretString::from(format!("Bearer {}", token.expose()));
        let client = self.clone();
        let target = repo.clone();

        let (tags, truncated) =
            tokio::task::spawn_blocking(move || client.fetch_tags_blocking(&target, &auth))
                .await
                .map_err(|e| PrivrelError::RemoteTransport {
                    repo: repo.to_string(),
                    reason: format!("registry request aborted: {}", e),
                })??;

        let versions = VersionList::from_tags(repo, &tags)?;
        debug!("{} lists {} versions", repo, versions.len());
        Ok(ReleaseListing {
            versions,
            truncated,
        })
    }
}
