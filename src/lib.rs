//! privrel - cache-aware version resolution and installation of private releases
//!
//! Lists the published versions of a privately hosted repository through a
//! local TTL cache, and installs release binaries with an external installer.
//! Registry tokens come from a credential backend on demand and are never
//! stored.

pub mod cache;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod hooks;
pub mod install;
pub mod registry;
pub mod resolver;
pub mod version;

#[cfg(test)]
mod testing;

pub use error::{PrivrelError, PrivrelResult};
