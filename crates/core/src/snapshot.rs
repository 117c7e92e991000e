//! Snapshot record data structures

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::cmp::Ordering;

/// A snapshot of one dataset at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRecord {
    /// Owning dataset (e.g. `tank/data`)
    pub dataset: String,
    /// Snapshot name, unique within the dataset (e.g. `auto-20240510.1400-2w`)
    pub name: String,
    /// Creation time (UTC)
    pub created_at: DateTime<Utc>,
    /// Space this snapshot alone would reclaim if destroyed
    pub used_bytes: u64,
    /// External protection tag
    pub protection: Protection,
}

/// Whether external policy forbids automatic deletion
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protection {
    /// No tag set
    #[default]
    None,
    /// Tagged by an external tool (e.g. `freenas:state=LATEST`)
    Tagged(String),
}

impl Protection {
    /// Interpret a raw property value; `-` and the empty string mean "unset"
    pub fn from_property(value: &str) -> Self {
        match value.trim() {
            "" | "-" => Protection::None,
            tag => Protection::Tagged(tag.to_string()),
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Protection::Tagged(_))
    }
}

impl SnapshotRecord {
    /// Create an unprotected snapshot record
    pub fn new(
        dataset: impl Into<String>,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
        used_bytes: u64,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            name: name.into(),
            created_at,
            used_bytes,
            protection: Protection::None,
        }
    }

    /// Create a record from epoch seconds, as reported by `zfs get -p creation`
    pub fn at_epoch(
        dataset: impl Into<String>,
        name: impl Into<String>,
        epoch_secs: i64,
        used_bytes: u64,
    ) -> Option<Self> {
        let created_at = Utc.timestamp_opt(epoch_secs, 0).single()?;
        Some(Self::new(dataset, name, created_at, used_bytes))
    }

    pub fn with_protection(mut self, protection: Protection) -> Self {
        self.protection = protection;
        self
    }

    /// `dataset@name`
    pub fn full_name(&self) -> String {
        format!("{}@{}", self.dataset, self.name)
    }

    /// True if destroying this snapshot would reclaim nothing
    pub fn is_empty(&self) -> bool {
        self.used_bytes == 0
    }

    pub fn is_protected(&self) -> bool {
        self.protection.is_protected()
    }

    /// Strict total order within a dataset: creation time, then name
    pub fn chronological(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.name.cmp(&other.name))
    }
}
