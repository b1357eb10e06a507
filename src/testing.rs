//! Call-counting fakes for the collaborator traits

use crate::credentials::{Availability, CredentialProvider, CredentialReference, Token};
use crate::error::{InstallAttempt, PrivrelError, PrivrelResult};
use crate::install::installer::{InstallOutcome, Installer, InstallerInvocation};
use crate::registry::{ReleaseListing, ReleaseRegistry};
use crate::version::{RepositoryId, VersionList};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const FAKE_TOKEN: &str = "ghp_faketoken0123456789abcdef";

/// Credential provider returning a fixed token, or a fixed availability failure
pub struct FakeCredentials {
    availability: Availability,
    pub calls: AtomicUsize,
}

impl FakeCredentials {
    pub fn ready() -> Self {
        Self::with_availability(Availability::Ready)
    }

    pub fn with_availability(availability: Availability) -> Self {
        Self {
            availability,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for FakeCredentials {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn is_available(&self, _account: Option<&str>) -> Availability {
        self.availability.clone()
    }

    async fn fetch_token(&self, reference: &CredentialReference) -> PrivrelResult<Token> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let account = reference.account.as_deref();
        if let Some(err) = self.availability.clone().into_error(account) {
            return Err(err);
        }
        Ok(Token::new(FAKE_TOKEN.to_string()))
    }
}

/// Registry serving a fixed tag listing, or failing with a fixed status
pub struct FakeRegistry {
    tags: Mutex<Vec<String>>,
    fail_with: Option<u16>,
    truncated: bool,
    pub calls: AtomicUsize,
}

impl FakeRegistry {
    pub fn with_tags(tags: &[&str]) -> Self {
        Self {
            tags: Mutex::new(tags.iter().map(|t| t.to_string()).collect()),
            fail_with: None,
            truncated: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// 401, 404 or 429 responses
    pub fn failing(status: u16) -> Self {
        Self {
            tags: Mutex::new(Vec::new()),
            fail_with: Some(status),
            truncated: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Report listings as cut short by the page limit
    pub fn truncated(mut self) -> Self {
        self.truncated = true;
        self
    }

    pub fn publish(&self, tag: &str) {
        self.tags.lock().unwrap().push(tag.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseRegistry for FakeRegistry {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_versions(
        &self,
        repo: &RepositoryId,
        token: &Token,
    ) -> PrivrelResult<ReleaseListing> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(token.expose(), FAKE_TOKEN);

        match self.fail_with {
            Some(401) => Err(PrivrelError::RemoteAuthFailed {
                repo: repo.to_string(),
                status: 401,
            }),
            Some(404) => Err(PrivrelError::RemoteNotFound {
                repo: repo.to_string(),
                version: None,
            }),
            Some(_) => Err(PrivrelError::RemoteRateLimited {
                repo: repo.to_string(),
                reset_at: None,
            }),
            None => {
                let tags = self.tags.lock().unwrap().clone();
                Ok(ReleaseListing {
                    versions: VersionList::from_tags(repo, &tags)?,
                    truncated: self.truncated,
                })
            }
        }
    }
}

/// Installer that succeeds only for listed tags, writing `files` on success
pub struct FakeInstaller {
    available: bool,
    accept_tags: Vec<String>,
    files: Vec<String>,
    pub invocations: Mutex<Vec<InstallerInvocation>>,
    pub tokens_seen: Mutex<Vec<String>>,
}

impl FakeInstaller {
    pub fn accepting(tags: &[&str], files: &[&str]) -> Self {
        Self {
            available: true,
            accept_tags: tags.iter().map(|t| t.to_string()).collect(),
            files: files.iter().map(|f| f.to_string()).collect(),
            invocations: Mutex::new(Vec::new()),
            tokens_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn missing() -> Self {
        Self {
            available: false,
            ..Self::accepting(&[], &[])
        }
    }

    pub fn tags_tried(&self) -> Vec<String> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.tag.clone())
            .collect()
    }
}

#[async_trait]
impl Installer for FakeInstaller {
    fn program(&self) -> &str {
        "fake-installer"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn run(
        &self,
        invocation: &InstallerInvocation,
        token: &Token,
    ) -> PrivrelResult<InstallOutcome> {
        self.invocations.lock().unwrap().push(invocation.clone());
        self.tokens_seen.lock().unwrap().push(token.expose().to_string());

        if self.accept_tags.contains(&invocation.tag) {
            std::fs::create_dir_all(&invocation.destination).unwrap();
            for file in &self.files {
                std::fs::write(invocation.destination.join(file), b"#!/bin/sh\n").unwrap();
            }
            return Ok(InstallOutcome::Succeeded);
        }

        Ok(InstallOutcome::Failed(InstallAttempt {
            tag: invocation.tag.clone(),
            exit_code: Some(1),
            stderr: format!("no release tagged {}", invocation.tag),
        }))
    }
}
