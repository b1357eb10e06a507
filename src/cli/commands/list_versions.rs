//! List-versions command - resolve versions through the cache

use super::print_json;
use crate::cli::args::ListVersionsArgs;
use crate::config::Config;
use crate::error::PrivrelResult;
use crate::hooks::{Hooks, ListVersionsRequest};

/// Execute the list-versions command
pub async fn execute(args: ListVersionsArgs, config: &Config) -> PrivrelResult<()> {
    let mut config = config.clone();
    if args.force_refresh {
        config.cache.force_refresh = true;
    }

    let hooks = Hooks::from_config(config);
    let response = hooks
        .list_versions(&ListVersionsRequest {
            repo: args.repo,
            requested_version: args.requested_version,
        })
        .await?;

    print_json(&response)
}
