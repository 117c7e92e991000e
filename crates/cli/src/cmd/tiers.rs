//! Show the effective retention policy

use crate::system_config::SystemConfig;
use anyhow::Result;
use owo_colors::OwoColorize;
use retention::Representative;

pub async fn run(config: &SystemConfig) -> Result<()> {
    let policy = config.policy()?;

    println!("{}", "Retention Tiers".bold());
    if config.tiers.is_empty() {
        println!("{}", "(built-in defaults)".dimmed());
    }
    println!();

    if policy.tiers().is_empty() {
        println!("  {}", "No tiers: only the latest snapshot of each dataset is kept".yellow());
    }
    for tier in policy.tiers() {
        println!("  {}", tier);
    }

    let representative = match policy.representative() {
        Representative::First => "first (oldest snapshot in each bucket)",
        Representative::Last => "last (newest snapshot in each bucket)",
    };
    println!();
    println!("{}: {}", "Representative".cyan(), representative);
    println!("{}: {}", "Prune empty".cyan(), policy.prune_empty());

    Ok(())
}
