//! Credential providers
//!
//! A provider turns a [`CredentialReference`] into a [`Token`]. Tokens live
//! only for the operation that fetched them: they are never cached, written
//! to disk, or logged.

pub mod onepassword;

pub use onepassword::OnePasswordCli;

use crate::error::{PrivrelError, PrivrelResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Locator of a secret in the credential backend (e.g. `op://vault/item/field`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialReference {
    /// Secret locator
    pub locator: String,

    /// Backend account to read from, when more than one is signed in
    pub account: Option<String>,
}

impl CredentialReference {
    pub fn new(locator: impl Into<String>, account: Option<String>) -> Self {
        Self {
            locator: locator.into(),
            account,
        }
    }
}

impl fmt::Display for CredentialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.account {
            Some(account) => write!(f, "{} (account {})", self.locator, account),
            None => f.write_str(&self.locator),
        }
    }
}

/// A secret token, zeroed on drop and redacted in `Debug`/`Display`
pub struct Token {
    inner: SecretString,
}

impl Token {
    pub fn new(value: String) -> Self {
        Self {
            inner: SecretString::from(value),
        }
    }

    /// Expose the token value. Only pass it straight to a request header or
    /// a child process environment.
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Result of probing a credential backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Installed and signed in
    Ready,
    /// Backend executable is missing
    NotInstalled { reason: String },
    /// Backend is present but has no usable session
    Unauthenticated { reason: String },
    /// Backend is present but could not serve requests
    Unreachable { reason: String },
}

impl Availability {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Human-readable reason when not ready
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ready => None,
            Self::NotInstalled { reason }
            | Self::Unauthenticated { reason }
            | Self::Unreachable { reason } => Some(reason),
        }
    }

    /// Convert to the error a fetch should fail with, if any
    pub fn into_error(self, account: Option<&str>) -> Option<PrivrelError> {
        match self {
            Self::Ready => None,
            Self::NotInstalled { reason } | Self::Unreachable { reason } => {
                Some(PrivrelError::CredentialUnavailable { reason })
            }
            Self::Unauthenticated { .. } => Some(PrivrelError::CredentialUnauthenticated {
                account: account.map(str::to_string),
            }),
        }
    }
}

/// Source of secret tokens
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Probe the backend, optionally for a specific account
    async fn is_available(&self, account: Option<&str>) -> Availability;

    /// Fetch the token behind `reference`.
    ///
    /// Implementations probe availability first and fail fast with the
    /// matching classified error.
    async fn fetch_token(&self, reference: &CredentialReference) -> PrivrelResult<Token>;
}

/// Reject empty, implausibly short, or whitespace-containing secrets
pub fn validate_token(
    reference: &CredentialReference,
    raw: String,
    min_length: usize,
) -> PrivrelResult<Token> {
    let invalid = |reason: String| PrivrelError::CredentialInvalid {
        reference: reference.locator.clone(),
        reason,
    };

    let token = Token::new(raw.trim().to_string());
    // zero the untrimmed copy
    drop(SecretString::from(raw));

    if token.is_empty() {
        return Err(invalid("backend returned an empty value".to_string()));
    }
    if token.len() < min_length {
        return Err(invalid(format!(
            "value is shorter than {} characters",
            min_length
        )));
    }
    if token.expose().chars().any(char::is_whitespace) {
        return Err(invalid("value contains whitespace".to_string()));
    }

    Ok(token)
}
