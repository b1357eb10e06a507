//! Status command - check credential backend, installer and configuration

use crate::cache::VersionCache;
use crate::config::Config;
use crate::credentials::{Availability, CredentialProvider};
use crate::error::PrivrelResult;
use crate::hooks::Hooks;
use crate::install::Installer;
use console::{style, Emoji};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");

/// Execute the status command
pub async fn execute(config: &Config) -> PrivrelResult<()> {
    println!("{}", style("privrel status").bold().cyan());

    let hooks = Hooks::from_config(config.clone());

    let mut all_ok = true;
    all_ok &= check_config(hooks.config());
    all_ok &= check_credentials(hooks.credentials(), hooks.config()).await;
    all_ok &= check_installer(hooks.installer()).await;
    check_cache(hooks.cache(), hooks.config());

    println!();
    if all_ok {
        println!("{}", style("All checks passed").green().bold());
    } else {
        println!(
            "{}",
            style("Some checks failed - see above for details").yellow().bold()
        );
    }

    Ok(())
}

fn check_config(config: &Config) -> bool {
    println!();
    println!("{}", style("Configuration:").bold());

    match config.require_reference() {
        Ok(reference) => {
            println!("  {} Token reference: {}", CHECK, reference);
            true
        }
        Err(e) => {
            println!("  {} {}", CROSS, style(e).red());
            false
        }
    }
}

async fn check_credentials(provider: &dyn CredentialProvider, config: &Config) -> bool {
    println!();
    println!("{}", style("Credential backend:").bold());

    let account = configured_account(config);
    match provider.is_available(account.as_deref()).await {
        Availability::Ready => {
            println!("  {} {} ready", CHECK, provider.name());
            true
        }
        Availability::NotInstalled { reason } => {
            println!(
                "  {} {} - {}",
                CROSS,
                style("Not installed").red(),
                reason
            );
            false
        }
        Availability::Unauthenticated { reason } => {
            println!(
                "  {} {} - {}",
                CROSS,
                style("Not signed in").red(),
                reason
            );
            false
        }
        Availability::Unreachable { reason } => {
            println!("  {} {} - {}", WARN, style("Unreachable").yellow(), reason);
            false
        }
    }
}

/// Account the token fetch would use, normalized the same way
fn configured_account(config: &Config) -> Option<String> {
    config.require_reference().ok().and_then(|r| r.account)
}

async fn check_installer(installer: &dyn Installer) -> bool {
    println!();
    println!("{}", style("Installer:").bold());

    if installer.is_available().await {
        println!("  {} {} found", CHECK, installer.program());
        true
    } else {
        println!(
            "  {} {} - {} not found in PATH",
            CROSS,
            style("Not installed").red(),
            installer.program()
        );
        false
    }
}

fn check_cache(cache: &VersionCache, config: &Config) {
    println!();
    println!("{}", style("Cache:").bold());

    let state = if cache.dir().is_dir() {
        "present"
    } else {
        "not created yet"
    };
    println!(
        "  {} {} ({}, ttl {} days)",
        CHECK,
        cache.dir().display(),
        state,
        config.cache.days
    );
}
