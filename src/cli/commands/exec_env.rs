//! Exec-env command - environment for an installed release

use super::print_json;
use crate::cli::args::ExecEnvArgs;
use crate::config::Config;
use crate::error::PrivrelResult;
use crate::hooks::{self, ExecEnvRequest};

/// Execute the exec-env command
pub fn execute(args: ExecEnvArgs, config: &Config) -> PrivrelResult<()> {
    let response = hooks::exec_env(
        &ExecEnvRequest {
            install_path: args.install_path,
        },
        &config.installer.bin_dir,
    );
    print_json(&response)
}
