//! Cache-aware version resolution
//!
//! A lookup is answered from the cache whenever that is safe, and only
//! reaches the credential backend and the registry when it has to:
//!
//! 1. `force_refresh` drops the cached entry and goes straight to a refresh.
//! 2. A fresh entry answers a blanket listing as-is.
//! 3. A fresh entry answers a request for a specific version only if it
//!    contains that version; otherwise the entry is ignored and refreshed,
//!    so a release published after the cache was written is never masked.
//! 4. A refresh fetches a token, lists the registry, and rewrites the cache.
//!    A listing cut short by the registry's page limit is returned but not
//!    cached, so it never masks older releases on later lookups.

use crate::cache::VersionCache;
use crate::config::schema::CacheConfig;
use crate::credentials::{CredentialProvider, CredentialReference};
use crate::error::{PrivrelError, PrivrelResult};
use crate::registry::ReleaseRegistry;
use crate::version::{normalize, RepositoryId, VersionList};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Cache policy for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub max_age_days: u32,
    pub force_refresh: bool,
}

impl From<&CacheConfig> for ResolveOptions {
    fn from(config: &CacheConfig) -> Self {
        Self {
            max_age_days: config.days,
            force_refresh: config.force_refresh,
        }
    }
}

/// Where a resolved list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Cache,
    Registry,
}

/// Resolved version list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub versions: VersionList,
    pub source: ResolutionSource,
}

/// Resolves the versions of a repository through the cache
pub struct Resolver<'a> {
    cache: &'a VersionCache,
    credentials: &'a dyn CredentialProvider,
    registry: &'a dyn ReleaseRegistry,
    reference: CredentialReference,
    options: ResolveOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(
        cache: &'a VersionCache,
        credentials: &'a dyn CredentialProvider,
        registry: &'a dyn ReleaseRegistry,
        reference: CredentialReference,
        options: ResolveOptions,
    ) -> Self {
        Self {
            cache,
            credentials,
            registry,
            reference,
            options,
        }
    }

    /// Resolve the version list of `repo`, optionally making sure `requested` is in it
    pub async fn resolve(
        &self,
        repo: &RepositoryId,
        requested: Option<&str>,
    ) -> PrivrelResult<Resolution> {
        if self.options.force_refresh {
            info!("Forced refresh of {}", repo);
            if let Err(e) = self.cache.invalidate(repo).await {
                warn!("Failed to invalidate cache for {}: {}", repo, e);
            }
        } else if let Some(cached) = self.fresh_versions(repo).await {
            match requested {
                Some(version) if cached.contains(version) => {
                    debug!("{} {} found in cache", repo, normalize(version));
                    return Ok(Resolution {
                        versions: cached,
                        source: ResolutionSource::Cache,
                    });
                }
                Some(version) => {
                    info!(
                        "{} {} is not in the cached list, refreshing",
                        repo,
                        normalize(version)
                    );
                }
                None => {
                    debug!("Serving {} versions of {} from cache", cached.len(), repo);
                    return Ok(Resolution {
                        versions: cached,
                        source: ResolutionSource::Cache,
                    });
                }
            }
        }

        let versions = self.refresh(repo).await?;

        if let Some(version) = requested {
            if !versions.contains(version) {
                return Err(PrivrelError::RemoteNotFound {
                    repo: repo.to_string(),
                    version: Some(normalize(version).to_string()),
                });
            }
        }

        Ok(Resolution {
            versions,
            source: ResolutionSource::Registry,
        })
    }

    async fn fresh_versions(&self, repo: &RepositoryId) -> Option<VersionList> {
        let entry = self.cache.get(repo).await?;
        if entry.is_fresh_at(self.options.max_age_days, Utc::now()) {
            Some(entry.versions)
        } else {
            debug!("Cached versions of {} are stale", repo);
            None
        }
    }

    async fn refresh(&self, repo: &RepositoryId) -> PrivrelResult<VersionList> {
        debug!(
            "Fetching token for {} via {}",
            repo,
            self.credentials.name()
        );
        let token = self.credentials.fetch_token(&self.reference).await?;
        let listing = self.registry.fetch_versions(repo, &token).await?;
        drop(token);

        let versions = listing.versions;
        if listing.truncated {
            warn!("Listing of {} is incomplete, not caching it", repo);
        } else if let Err(e) = self.cache.put(repo, &versions).await {
            warn!("Failed to cache versions of {}: {}", repo, e);
        }

        info!(
            "Refreshed {} versions of {} from {}",
            versions.len(),
            repo,
            self.registry.name()
        );
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Availability;
    use crate::testing::{FakeCredentials, FakeRegistry, FAKE_TOKEN};
    use chrono::Duration;
    use tempfile::TempDir;

    struct Harness {
        cache: VersionCache,
        credentials: FakeCredentials,
        registry: FakeRegistry,
        _temp: TempDir,
    }

    impl Harness {
        fn new(credentials: FakeCredentials, registry: FakeRegistry) -> Self {
            let temp = TempDir::new().unwrap();
            Self {
                cache: VersionCache::new(temp.path().join("versions")),
                credentials,
                registry,
                _temp: temp,
            }
        }

        fn with_tags(tags: &[&str]) -> Self {
            Self::new(FakeCredentials::ready(), FakeRegistry::with_tags(tags))
        }

        fn resolver(&self, max_age_days: u32, force_refresh: bool) -> Resolver<'_> {
            Resolver::new(
                &self.cache,
                &self.credentials,
                &self.registry,
                CredentialReference::new("op://Private/GitHub/token", None),
                ResolveOptions {
                    max_age_days,
                    force_refresh,
                },
            )
        }

        async fn seed(&self, versions: &[&str], age: Duration) {
            let list = VersionList::from_tags(&repo(), versions.iter().copied()).unwrap();
            self.cache
                .put_at(&repo(), &list, Utc::now() - age)
                .await
                .unwrap();
        }

        fn remote_calls(&self) -> (usize, usize) {
            (self.credentials.calls(), self.registry.calls())
        }
    }

    fn repo() -> RepositoryId {
        RepositoryId::parse("acme/tool").unwrap()
    }

    #[tokio::test]
    async fn cached_version_served_without_remote_calls() {
        let h = Harness::with_tags(&["v1.0.0", "v1.1.0", "v1.2.0"]);
        h.seed(&["1.0.0", "1.1.0"], Duration::hours(1)).await;

        for requested in ["1.1.0", "v1.1.0"] {
            let resolution = h.resolver(7, false).resolve(&repo(), Some(requested)).await.unwrap();
            assert_eq!(resolution.versions.as_slice(), ["1.0.0", "1.1.0"]);
            assert_eq!(resolution.source, ResolutionSource::Cache);
        }

        assert_eq!(h.remote_calls(), (0, 0));
    }

    #[tokio::test]
    async fn missing_version_triggers_one_refresh() {
        let h = Harness::with_tags(&["v1.0.0", "v1.1.0", "v1.2.0"]);
        h.seed(&["1.0.0", "1.1.0"], Duration::hours(1)).await;

        let resolution = h.resolver(7, false).resolve(&repo(), Some("1.2.0")).await.unwrap();

        assert!(resolution.versions.contains("1.2.0"));
        assert_eq!(resolution.source, ResolutionSource::Registry);
        assert_eq!(h.remote_calls(), (1, 1));

        let cached = h.cache.get(&repo()).await.unwrap();
        assert_eq!(cached.versions.as_slice(), ["1.0.0", "1.1.0", "1.2.0"]);
    }

    #[tokio::test]
    async fn blanket_listing_accepts_fresh_cache() {
        let h = Harness::with_tags(&["v1.0.0", "v2.0.0"]);
        h.seed(&["1.0.0"], Duration::days(6)).await;

        let resolution = h.resolver(7, false).resolve(&repo(), None).await.unwrap();

        assert_eq!(resolution.versions.as_slice(), ["1.0.0"]);
        assert_eq!(h.remote_calls(), (0, 0));
    }

    #[tokio::test]
    async fn consecutive_listings_refresh_once() {
        let h = Harness::with_tags(&["v1.0.0", "v1.1.0"]);

        let first = h.resolver(7, false).resolve(&repo(), None).await.unwrap();
        let second = h.resolver(7, false).resolve(&repo(), None).await.unwrap();

        assert_eq!(first.versions, second.versions);
        assert_eq!(first.source, ResolutionSource::Registry);
        assert_eq!(second.source, ResolutionSource::Cache);
        assert_eq!(h.remote_calls(), (1, 1));
    }

    #[tokio::test]
    async fn stale_cache_is_refreshed() {
        let h = Harness::with_tags(&["v1.0.0", "v1.1.0"]);
        h.seed(&["1.0.0"], Duration::days(8)).await;

        let resolution = h.resolver(7, false).resolve(&repo(), None).await.unwrap();

        assert_eq!(resolution.versions.as_slice(), ["1.0.0", "1.1.0"]);
        assert_eq!(h.remote_calls(), (1, 1));
    }

    #[tokio::test]
    async fn zero_day_ttl_always_refreshes() {
        let h = Harness::with_tags(&["v1.0.0"]);
        h.resolver(0, false).resolve(&repo(), None).await.unwrap();
        h.resolver(0, false).resolve(&repo(), None).await.unwrap();
        assert_eq!(h.remote_calls(), (2, 2));
    }

    #[tokio::test]
    async fn force_refresh_ignores_fresh_cache() {
        let h = Harness::with_tags(&["v1.0.0", "v1.1.0"]);
        h.seed(&["1.0.0", "1.1.0"], Duration::minutes(5)).await;

        let resolution = h.resolver(7, true).resolve(&repo(), Some("1.0.0")).await.unwrap();

        assert_eq!(resolution.source, ResolutionSource::Registry);
        assert_eq!(h.remote_calls(), (1, 1));
    }

    #[tokio::test]
    async fn newly_published_version_found_after_cache_write() {
        let h = Harness::with_tags(&["v1.0.0"]);
        h.resolver(7, false).resolve(&repo(), None).await.unwrap();

        h.registry.publish("v1.1.0");
        let resolution = h.resolver(7, false).resolve(&repo(), Some("v1.1.0")).await.unwrap();

        assert!(resolution.versions.contains("1.1.0"));
        assert_eq!(h.remote_calls(), (2, 2));
    }

    #[tokio::test]
    async fn version_missing_upstream_is_not_found() {
        let h = Harness::with_tags(&["v1.0.0", "v1.1.0"]);
        h.seed(&["1.0.0"], Duration::hours(1)).await;

        let err = h
            .resolver(7, false)
            .resolve(&repo(), Some("v9.9.9"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PrivrelError::RemoteNotFound { version: Some(ref v), .. } if v == "9.9.9"
        ));
        assert_eq!(h.remote_calls(), (1, 1));
        // The refreshed list is still cached
        let cached = h.cache.get(&repo()).await.unwrap();
        assert!(cached.versions.contains("1.1.0"));
    }

    #[tokio::test]
    async fn credential_failure_skips_registry() {
        let h = Harness::new(
            FakeCredentials::with_availability(Availability::Unauthenticated {
                reason: "no accounts".to_string(),
            }),
            FakeRegistry::with_tags(&["v1.0.0"]),
        );

        let err = h.resolver(7, false).resolve(&repo(), None).await.unwrap_err();

        assert!(matches!(err, PrivrelError::CredentialUnauthenticated { .. }));
        assert_eq!(h.remote_calls(), (1, 0));
        assert!(h.cache.get(&repo()).await.is_none());
    }

    #[tokio::test]
    async fn registry_failure_during_fallback_is_surfaced() {
        let h = Harness::new(FakeCredentials::ready(), FakeRegistry::failing(429));
        h.seed(&["1.0.0"], Duration::hours(1)).await;

        let err = h
            .resolver(7, false)
            .resolve(&repo(), Some("1.1.0"))
            .await
            .unwrap_err();

        assert!(matches!(err, PrivrelError::RemoteRateLimited { .. }));
        assert_eq!(h.remote_calls(), (1, 1));
        // The existing entry is left alone
        let cached = h.cache.get(&repo()).await.unwrap();
        assert_eq!(cached.versions.as_slice(), ["1.0.0"]);
    }

    #[tokio::test]
    async fn empty_listing_is_not_cached() {
        let h = Harness::with_tags(&[]);

        let err = h.resolver(7, false).resolve(&repo(), None).await.unwrap_err();

        assert!(matches!(err, PrivrelError::NoVersionsFound { .. }));
        assert!(h.cache.get(&repo()).await.is_none());
    }

    #[tokio::test]
    async fn token_never_reaches_cache_files() {
        let h = Harness::with_tags(&["v1.0.0", "v1.1.0"]);
        h.resolver(7, true).resolve(&repo(), Some("1.1.0")).await.unwrap();

        let mut files = 0;
        for entry in std::fs::read_dir(h.cache.dir()).unwrap() {
            let content = std::fs::read_to_string(entry.unwrap().path()).unwrap();
            assert!(!content.contains(FAKE_TOKEN));
            files += 1;
        }
        assert_eq!(files, 2);
    }

    #[tokio::test]
    async fn cache_write_failure_still_returns_versions() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let cache = VersionCache::new(&blocker);
        let credentials = FakeCredentials::ready();
        let registry = FakeRegistry::with_tags(&["v1.0.0"]);
        let resolver = Resolver::new(
            &cache,
            &credentials,
            &registry,
            CredentialReference::new("op://Private/GitHub/token", None),
            ResolveOptions {
                max_age_days: 7,
                force_refresh: false,
            },
        );

        let resolution = resolver.resolve(&repo(), None).await.unwrap();
        assert_eq!(resolution.versions.as_slice(), ["1.0.0"]);
    }

    #[tokio::test]
    async fn entries_of_similar_repositories_stay_apart() {
        let h = Harness::with_tags(&["v1.0.0"]);
        let first = RepositoryId::parse("acme/tool__x").unwrap();
        let second = RepositoryId::parse("acme__tool/x").unwrap();
        let list = VersionList::from_tags(&first, ["9.9.9"]).unwrap();
        h.cache.put(&first, &list).await.unwrap();

        let err = h
            .resolver(7, false)
            .resolve(&second, Some("9.9.9"))
            .await
            .unwrap_err();

        assert!(matches!(err, PrivrelError::RemoteNotFound { .. }));
        assert_eq!(h.remote_calls(), (1, 1));
        assert_eq!(h.cache.get(&first).await.unwrap().versions.as_slice(), ["9.9.9"]);
    }

    #[tokio::test]
    async fn truncated_listing_is_not_cached() {
        let h = Harness::new(
            FakeCredentials::ready(),
            FakeRegistry::with_tags(&["v2.0.0", "v2.1.0"]).truncated(),
        );
        h.seed(&["1.0.0"], Duration::days(30)).await;

        let resolution = h.resolver(7, false).resolve(&repo(), None).await.unwrap();
        assert_eq!(resolution.versions.as_slice(), ["2.0.0", "2.1.0"]);

        // The stale entry is left as it was
        let cached = h.cache.get(&repo()).await.unwrap();
        assert_eq!(cached.versions.as_slice(), ["1.0.0"]);
    }
}
