//! Cache command - inspect and clear cached version lists

use crate::cache::{CacheEntry, VersionCache};
use crate::cli::args::{CacheAction, CacheArgs};
use crate::config::{Config, ConfigManager};
use crate::error::PrivrelResult;
use crate::version::RepositoryId;
use chrono::{DateTime, Utc};
use console::style;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> PrivrelResult<()> {
    let cache = VersionCache::new(ConfigManager::cache_dir(config));

    match args.action {
        CacheAction::Show { repo } => show(&cache, &RepositoryId::parse(&repo)?, config).await,
        CacheAction::Clear { all: true, .. } => clear_all(&cache).await,
        CacheAction::Clear { repo: Some(repo), .. } => {
            clear_one(&cache, &RepositoryId::parse(&repo)?).await
        }
        CacheAction::Clear { repo: None, .. } => clear_all(&cache).await,
    }
}

async fn show(cache: &VersionCache, repo: &RepositoryId, config: &Config) -> PrivrelResult<()> {
    let Some(entry) = cache.get(repo).await else {
        println!("No cached versions for {}", repo);
        return Ok(());
    };

    print_entry(&entry, config.cache.days, Utc::now());
    Ok(())
}

fn print_entry(entry: &CacheEntry, max_age_days: u32, now: DateTime<Utc>) {
    let freshness = if entry.is_fresh_at(max_age_days, now) {
        style("fresh").green().to_string()
    } else {
        style("stale").yellow().to_string()
    };

    println!("{}", style(&entry.repo).bold());
    println!(
        "  Fetched:  {} ({})",
        entry.fetched_at.format("%Y-%m-%d %H:%M UTC"),
        format_age(entry, now)
    );
    println!("  State:    {} (ttl {} days)", freshness, max_age_days);
    println!("  Versions: {}", entry.versions.len());
    for version in entry.versions.iter() {
        println!("    {}", version);
    }
}

fn format_age(entry: &CacheEntry, now: DateTime<Utc>) -> String {
    let age = entry.age(now);
    if age.num_seconds() < 0 {
        "in the future".to_string()
    } else if age.num_days() > 0 {
        format!("{}d ago", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{}h ago", age.num_hours())
    } else {
        format!("{}m ago", age.num_minutes())
    }
}

async fn clear_one(cache: &VersionCache, repo: &RepositoryId) -> PrivrelResult<()> {
    cache.invalidate(repo).await?;
    println!("Cleared cached versions for {}", repo);
    Ok(())
}

async fn clear_all(cache: &VersionCache) -> PrivrelResult<()> {
    let removed = cache.clear().await?;
    println!("Removed {} cache files", removed);
    Ok(())
}
