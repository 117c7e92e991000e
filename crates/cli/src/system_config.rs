//! System configuration
//!
//! Loaded once per run from `--config PATH` or `<config dir>/rollup/config.toml`,
//! validated, and turned into an immutable [`RetentionPolicy`].

use anyhow::{Context, Result};
use retention::{default_tiers, parse_period, Representative, RetentionPolicy, TierSpec};
use rollup_core::Granularity;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Invalid configuration file content
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tier #{0} has an empty name")]
    EmptyTierName(usize),

    #[error("tier {0:?} needs exactly one of `granularity` or `period`")]
    TierKind(String),

    #[error("`zfs.command` must not be empty")]
    EmptyCommand,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub zfs: ZfsConfig,
    pub prune: PruneConfig,
    #[serde(rename = "tier")]
    pub tiers: Vec<TierConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZfsConfig {
    /// Program used to list and destroy snapshots
    pub command: String,
    /// User property that marks a snapshot as protected
    pub protection_property: String,
    /// Exclusive lock held by live runs
    pub lock_file: Option<PathBuf>,
}

impl Default for ZfsConfig {
    fn default() -> Self {
        Self {
            command: "zfs".to_string(),
            protection_property: "freenas:state".to_string(),
            lock_file: None,
        }
    }
}

impl ZfsConfig {
    pub fn lock_path(&self) -> PathBuf {
        self.lock_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("rollup.lock"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    pub prefixes: Vec<String>,
    pub recursive: bool,
    pub prune_empty: bool,
    pub representative: Representative,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            prefixes: vec![rollup_core::filter::DEFAULT_PREFIX.to_string()],
            recursive: false,
            prune_empty: false,
            representative: Representative::First,
        }
    }
}

/// Seconds or a duration string such as `4h`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PeriodValue {
    Seconds(u64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierConfig {
    pub name: String,
    pub abbreviation: Option<String>,
    pub granularity: Option<Granularity>,
    pub period: Option<PeriodValue>,
    #[serde(default)]
    pub capacity: usize,
}

impl TierConfig {
    fn to_spec(&self, index: usize) -> Result<TierSpec> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyTierName(index + 1).into());
        }

        let abbreviation = match &self.abbreviation {
            Some(abbreviation) => abbreviation.clone(),
            None => name.chars().take(1).collect(),
        };

        let spec = match (&self.granularity, &self.period) {
            (Some(granularity), None) => {
                TierSpec::calendar(name, &abbreviation, *granularity, self.capacity)
            }
            (None, Some(PeriodValue::Seconds(secs))) => {
                TierSpec::periodic(name, &abbreviation, *secs, self.capacity)
            }
            (None, Some(PeriodValue::Text(text))) => {
                let secs = parse_period(text)
                    .with_context(|| format!("Invalid period for tier {:?}", name))?;
                TierSpec::periodic(name, &abbreviation, secs, self.capacity)
            }
            _ => return Err(ConfigError::TierKind(name.to_string()).into()),
        };

        Ok(spec)
    }
}

impl SystemConfig {
    /// Check everything that can be checked without running anything
    pub fn validate(&self) -> Result<()> {
        if self.zfs.command.trim().is_empty() {
            return Err(ConfigError::EmptyCommand.into());
        }
        self.policy().map(|_| ())
    }

    /// Build the retention policy; no `[[tier]]` entries means the default tiers
    pub fn policy(&self) -> Result<RetentionPolicy> {
        let tiers = if self.tiers.is_empty() {
            default_tiers()
        } else {
            self.tiers
                .iter()
                .enumerate()
                .map(|(i, tier)| tier.to_spec(i))
                .collect::<Result<Vec<_>>>()?
        };

        let policy = RetentionPolicy::new(tiers).context("Invalid tier configuration")?;
        Ok(policy
            .with_representative(self.prune.representative)
            .with_prune_empty(self.prune.prune_empty))
    }
}

/// Default location of the config file
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rollup").join("config.toml"))
}

/// Explicit path if given, the default location otherwise
pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(config_file_path)
}

/// Load and validate the configuration.
///
/// A missing explicit file is an error; a missing default file means built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<SystemConfig> {
    let config = match explicit {
        Some(path) => parse_file(path)?,
        None => match config_file_path() {
            Some(path) if path.exists() => parse_file(&path)?,
            _ => SystemConfig::default(),
        },
    };

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<SystemConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse(&content).with_context(|| format!("Failed to parse config file {}", path.display()))
}

pub fn parse(content: &str) -> Result<SystemConfig> {
    Ok(toml::from_str(content)?)
}

/// Write the example config to `path` unless something is already there
pub fn init_if_missing(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, example_config())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(true)
}

/// Commented example matching the built-in defaults
pub fn example_config() -> &'static str {
    r#"# rollup configuration

[zfs]
# Program used to list and destroy snapshots
command = "zfs"
# Snapshots with this user property set (to anything but "-") are never deleted
protection_property = "freenas:state"
# Held by live runs so two runs never destroy concurrently
# lock_file = "/var/run/rollup.lock"

[prune]
# Only snapshots named <prefix>-... are managed
prefixes = ["auto"]
recursive = false
# Treat empty snapshots as invisible to tiers unless a bucket has nothing else
prune_empty = false
# Which snapshot represents a calendar bucket: "first" or "last"
representative = "first"

# Tiers are combined: a snapshot survives if any tier keeps it.
# capacity = 0 keeps every bucket.

[[tier]]
name = "hourly"
abbreviation = "h"
granularity = "hour"
capacity = 24

[[tier]]
name = "daily"
abbreviation = "d"
granularity = "day"
capacity = 7

[[tier]]
name = "weekly"
abbreviation = "w"
granularity = "week"
capacity = 0

# Periodic tiers keep snapshots spaced at least 90% of the period apart
# [[tier]]
# name = "frequent"
# abbreviation = "f"
# period = "15m"
# capacity = 4
"#
}
