//! Repository identifiers and normalized version lists

use crate::error::{PrivrelError, PrivrelResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Repository identifier of the form `owner/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryId {
    owner: String,
    name: String,
}

impl RepositoryId {
    /// Parse an `owner/name` string
    pub fn parse(s: &str) -> PrivrelResult<Self> {
        let invalid = || PrivrelError::InvalidRepository(s.to_string());

        let (owner, name) = s.trim().split_once('/').ok_or_else(invalid)?;
        if !Self::valid_segment(owner) || !Self::valid_segment(name) {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    fn valid_segment(segment: &str) -> bool {
        !segment.is_empty()
            && segment != "."
            && segment != ".."
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }

    /// Repository owner
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key safe to use as a file name. `@` never appears in a segment, so
    /// distinct repositories never share a key.
    pub fn cache_key(&self) -> String {
        format!("{}@{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryId {
    type Err = PrivrelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Strip the leading `v` tag convention from a version.
///
/// Only a `v` directly followed by a digit is removed, so normalizing twice
/// yields the same result.
pub fn normalize(tag: &str) -> &str {
    let tag = tag.trim();
    match tag.strip_prefix('v') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => tag,
    }
}

/// Non-empty, ordered list of normalized versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct VersionList(Vec<String>);

impl VersionList {
    /// Build a list from raw registry tags.
    ///
    /// Tags are normalized, deduplicated and sorted ascending (semver order
    /// where both sides parse, lexical otherwise). An empty result is
    /// `NoVersionsFound`.
    pub fn from_tags<I, S>(repo: &RepositoryId, tags: I) -> PrivrelResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut versions: Vec<String> = tags
            .into_iter()
            .map(|t| normalize(t.as_ref()).to_string())
            .filter(|v| !v.is_empty())
            .collect();

        versions.sort_by(|a, b| compare_versions(a, b));
        versions.dedup();

        if versions.is_empty() {
            return Err(PrivrelError::NoVersionsFound {
                repo: repo.to_string(),
            });
        }

        Ok(Self(versions))
    }

    /// Whether the list holds `version`, comparing normalized forms
    pub fn contains(&self, version: &str) -> bool {
        let wanted = normalize(version);
        self.0.iter().any(|v| normalize(v) == wanted)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for VersionList {
    type Error = &'static str;

    fn try_from(versions: Vec<String>) -> Result<Self, Self::Error> {
        if versions.is_empty() {
            return Err("version list is empty");
        }
        if versions.iter().any(|v| v.trim().is_empty()) {
            return Err("version list contains a blank entry");
        }
        Ok(Self(versions))
    }
}

impl From<VersionList> for Vec<String> {
    fn from(list: VersionList) -> Self {
        list.0
    }
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Err(_), Ok(_)) => Ordering::Less,
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
