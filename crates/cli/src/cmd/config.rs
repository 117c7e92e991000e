//! Configuration management command
//!
//! Shows the effective configuration, its location, and an example file.

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

/// List all configuration values
pub async fn run_list(config: &SystemConfig, explicit: Option<&Path>) -> Result<()> {
    let config_path = system_config::resolve_path(explicit)
        .context("Could not determine config file path")?;

    println!("{}", "System Configuration".bold());
    println!("{}: {}", "Location".dimmed(), config_path.display().dimmed());
    if !config_path.exists() {
        println!("{}", "(file does not exist, showing defaults)".dimmed());
    }
    println!();

    println!("{}", "[zfs]".yellow());
    println!("  {} = {}", "command".cyan(), config.zfs.command);
    println!("  {} = {}", "protection_property".cyan(), config.zfs.protection_property);
    println!("  {} = {}", "lock_file".cyan(), config.zfs.lock_path().display());

    println!("\n{}", "[prune]".yellow());
    println!("  {} = {:?}", "prefixes".cyan(), config.prune.prefixes);
    println!("  {} = {}", "recursive".cyan(), config.prune.recursive);
    println!("  {} = {}", "prune_empty".cyan(), config.prune.prune_empty);
    let policy = config.policy()?;
    println!("  {} = {}", "representative".cyan(), policy.representative().as_str());
    println!(
        "\n{} {}",
        "[[tier]]".yellow(),
        if config.tiers.is_empty() {
            "(built-in defaults)".dimmed().to_string()
        } else {
            format!("({})", policy.tiers().len()).dimmed().to_string()
        }
    );
    for tier in policy.tiers() {
        println!("  {}", tier);
    }

    println!("\n{}", "Valid Values:".bold());
    println!("  granularity: hour, day, week, month, year");
    println!("  period: seconds, or a duration such as 90s, 15m, 4h, 1d, 2w");
    println!("  capacity: 0 = unbounded");
    println!("  representative: first, last");

    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(explicit: Option<&Path>, create: bool) -> Result<()> {
    let config_path = system_config::resolve_path(explicit)
        .context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing(&config_path)?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    print!("{}", system_config::example_config());
    Ok(())
}
