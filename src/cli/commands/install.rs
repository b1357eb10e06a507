//! Install command - run the installer for one release

use super::print_json;
use crate::cli::args::InstallArgs;
use crate::config::Config;
use crate::error::PrivrelResult;
use crate::hooks::{Hooks, InstallRequest};

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config) -> PrivrelResult<()> {
    let hooks = Hooks::from_config(config.clone());
    let response = hooks
        .install(&InstallRequest {
            repo: args.repo,
            version: args.version,
            install_path: args.install_path,
        })
        .await?;

    print_json(&response)
}
