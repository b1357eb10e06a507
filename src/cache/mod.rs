//! On-disk version list cache
//!
//! Each repository owns two files in the cache directory, keyed by the
//! sanitized repository name:
//!
//! | File | Contents |
//! |------|----------|
//! | `<owner>@<name>.versions.json` | JSON array of normalized versions |
//! | `<owner>@<name>.timestamp` | Unix epoch seconds of the last full refresh |
//!
//! An entry only exists when both files are present and parse. Anything else
//! reads as a miss.

pub mod store;

pub use store::{CacheEntry, VersionCache};
