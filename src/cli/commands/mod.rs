//! CLI command implementations

pub mod cache;
pub mod config;
pub mod exec_env;
pub mod install;
pub mod list_versions;
pub mod status;

pub use cache::execute as cache;
pub use config::execute as config;
pub use exec_env::execute as exec_env;
pub use install::execute as install;
pub use list_versions::execute as list_versions;
pub use status::execute as status;

use crate::error::PrivrelResult;
use serde::Serialize;

/// Write a host-facing response to stdout
pub(crate) fn print_json<T: Serialize>(value: &T) -> PrivrelResult<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
