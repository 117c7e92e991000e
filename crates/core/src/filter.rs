//! Eligibility filtering
//!
//! Only automated snapshots (name starts with `<prefix>-`) that carry no
//! protection tag are subject to automatic retention decisions.

use crate::inventory::Inventory;
use crate::snapshot::SnapshotRecord;

/// Default automated snapshot prefix
pub const DEFAULT_PREFIX: &str = "auto";

/// Prefix-based eligibility filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityFilter {
    /// Prefixes including the trailing `-`
    prefixes: Vec<String>,
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self::new([DEFAULT_PREFIX])
    }
}

impl EligibilityFilter {
    /// Create a filter from bare prefixes (`auto`, not `auto-`).
    ///
    /// An empty list falls back to [`DEFAULT_PREFIX`].
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes: Vec<String> = prefixes
            .into_iter()
            .map(|p| format!("{}-", p.as_ref().trim_end_matches('-')))
            .collect();
        prefixes.sort();
        prefixes.dedup();

        if prefixes.is_empty() {
            prefixes.push(format!("{}-", DEFAULT_PREFIX));
        }

        Self { prefixes }
    }

    /// True if the snapshot belongs to the automated family
    pub fn in_family(&self, snapshot: &SnapshotRecord) -> bool {
        self.prefixes.iter().any(|p| snapshot.name.starts_with(p.as_str()))
    }

    /// True if the snapshot is subject to automatic deletion
    pub fn is_eligible(&self, snapshot: &SnapshotRecord) -> bool {
        self.in_family(snapshot) && !snapshot.is_protected()
    }

    /// Split an inventory into eligible snapshots and ignored ones.
    ///
    /// Rejected datasets stay with the eligible half.
    pub fn partition(&self, inventory: &Inventory) -> (Inventory, Vec<SnapshotRecord>) {
        let mut eligible = inventory.clone();
        eligible.retain(|s| self.is_eligible(s));

        let ignored = inventory
            .datasets()
            .flat_map(|(_, snapshots)| snapshots.iter())
            .filter(|s| !self.is_eligible(s))
            .cloned()
            .collect();

        (eligible, ignored)
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}
