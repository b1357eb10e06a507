//! Version cache store with TTL freshness

use crate::error::{PrivrelError, PrivrelResult};
use crate::version::{RepositoryId, VersionList};
use chrono::{DateTime, Duration, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const VERSIONS_SUFFIX: &str = ".versions.json";
const TIMESTAMP_SUFFIX: &str = ".timestamp";
const TMP_INFIX: &str = ".tmp.";

/// A cached version list together with the time it was fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub repo: RepositoryId,
    pub versions: VersionList,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Age of the entry relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }

    /// Fresh when `now - fetched_at < max_age_days` days.
    ///
    /// Entries stamped in the future are never fresh.
    pub fn is_fresh_at(&self, max_age_days: u32, now: DateTime<Utc>) -> bool {
        let age = self.age(now);
        age >= Duration::zero() && age < Duration::days(i64::from(max_age_days))
    }
}

/// Cache of version lists, one entry per repository
#[derive(Debug, Clone)]
pub struct VersionCache {
    dir: PathBuf,
}

impl VersionCache {
    /// Create a cache rooted at `dir`. The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the cached entry for `repo`, or `None` on any read or parse problem
    pub async fn get(&self, repo: &RepositoryId) -> Option<CacheEntry> {
        match self.load(repo).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Cache miss for {}: {}", repo, e);
                None
            }
        }
    }

    /// Whether a complete entry for `repo` exists and is younger than `max_age_days`
    pub async fn is_fresh(&self, repo: &RepositoryId, max_age_days: u32) -> bool {
        self.get(repo)
            .await
            .is_some_and(|entry| entry.is_fresh_at(max_age_days, Utc::now()))
    }

    /// Store `versions` for `repo`, stamped with the current time
    pub async fn put(&self, repo: &RepositoryId, versions: &VersionList) -> PrivrelResult<()> {
        self.put_at(repo, versions, Utc::now()).await
    }

    /// Store `versions` for `repo` with an explicit timestamp.
    ///
    /// The old timestamp is removed before the list is replaced, and the new
    /// timestamp is written last, so a concurrent reader sees either the old
    /// pair, a miss, or the new pair.
    pub(crate) async fn put_at(
        &self,
        repo: &RepositoryId,
        versions: &VersionList,
        fetched_at: DateTime<Utc>,
    ) -> PrivrelResult<()> {
        self.ensure_dir().await?;

        let versions_path = self.versions_path(repo);
        let timestamp_path = self.timestamp_path(repo);

        remove_if_exists(&timestamp_path).await?;

        let content = serde_json::to_string_pretty(versions)?;
        write_replace(&versions_path, content.as_bytes()).await?;
        write_replace(&timestamp_path, fetched_at.timestamp().to_string().as_bytes()).await?;

        debug!(
            "Cached {} versions for {} at {}",
            versions.len(),
            repo,
            fetched_at
        );
        Ok(())
    }

    /// Remove the entry for `repo`. Missing entries are not an error.
    pub async fn invalidate(&self, repo: &RepositoryId) -> PrivrelResult<()> {
        remove_if_exists(&self.timestamp_path(repo)).await?;
        remove_if_exists(&self.versions_path(repo)).await?;
        debug!("Invalidated cache for {}", repo);
        Ok(())
    }

    /// Remove every entry in the cache directory, returning how many files were deleted
    pub async fn clear(&self) -> PrivrelResult<usize> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(PrivrelError::io("reading cache directory", e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PrivrelError::io("reading cache entry", e))?
        {
            if is_cache_file(&entry.file_name().to_string_lossy()) {
                remove_if_exists(&entry.path()).await?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    async fn load(&self, repo: &RepositoryId) -> PrivrelResult<CacheEntry> {
        let corrupt = |reason: String| PrivrelError::CacheCorrupt {
            repo: repo.to_string(),
            reason,
        };

        let raw_timestamp = fs::read_to_string(self.timestamp_path(repo))
            .await
            .map_err(|e| corrupt(format!("timestamp: {}", e)))?;
        let raw_versions = fs::read_to_string(self.versions_path(repo))
            .await
            .map_err(|e| corrupt(format!("version list: {}", e)))?;

        let seconds: i64 = raw_timestamp
            .trim()
            .parse()
            .map_err(|e| corrupt(format!("timestamp {:?}: {}", raw_timestamp.trim(), e)))?;
        let fetched_at = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| corrupt(format!("timestamp {} out of range", seconds)))?;

        let versions: VersionList = serde_json::from_str(&raw_versions)
            .map_err(|e| corrupt(format!("version list: {}", e)))?;

        Ok(CacheEntry {
            repo: repo.clone(),
            versions,
            fetched_at,
        })
    }

    async fn ensure_dir(&self) -> PrivrelResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PrivrelError::io("creating version cache dir", e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            fs::set_permissions(&self.dir, perms)
                .await
                .map_err(|e| PrivrelError::io("setting version cache dir permissions", e))?;
        }

        Ok(())
    }

    fn versions_path(&self, repo: &RepositoryId) -> PathBuf {
        self.dir
            .join(format!("{}{}", repo.cache_key(), VERSIONS_SUFFIX))
    }

    fn timestamp_path(&self, repo: &RepositoryId) -> PathBuf {
        self.dir
            .join(format!("{}{}", repo.cache_key(), TIMESTAMP_SUFFIX))
    }
}

/// Write to a sibling temp file and rename over `path`
async fn write_replace(path: &Path, content: &[u8]) -> PrivrelResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!("{}{}", TMP_INFIX, std::process::id()));
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, content)
        .await
        .map_err(|e| PrivrelError::io(format!("writing cache file {}", tmp.display()), e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| PrivrelError::io(format!("replacing cache file {}", path.display()), e))
}

/// Entry files, including temp files left by an interrupted write
fn is_cache_file(name: &str) -> bool {
    [VERSIONS_SUFFIX, TIMESTAMP_SUFFIX].iter().any(|suffix| {
        name.ends_with(suffix) || name.contains(&format!("{}{}", suffix, TMP_INFIX))
    })
}

async fn remove_if_exists(path: &Path) -> PrivrelResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PrivrelError::io(
            format!("removing cache file {}", path.display()),
            e,
        )),
    }
}
