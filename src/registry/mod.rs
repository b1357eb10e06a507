//! Remote release registries

pub mod github;

pub use github::GithubReleases;

use crate::credentials::Token;
use crate::error::PrivrelResult;
use crate::version::{RepositoryId, VersionList};
use async_trait::async_trait;

/// Versions returned by one registry listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseListing {
    pub versions: VersionList,
    /// The listing stopped at the page limit, so older releases may be missing
    pub truncated: bool,
}

/// Source of published release tags
#[async_trait]
pub trait ReleaseRegistry: Send + Sync {
    /// Short registry name for logs
    fn name(&self) -> &'static str;

    /// List every published version of `repo`, normalized.
    ///
    /// An empty listing is `NoVersionsFound`.
    async fn fetch_versions(
        &self,
        repo: &RepositoryId,
        token: &Token,
    ) -> PrivrelResult<ReleaseListing>;
}
