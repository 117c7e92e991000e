//! Applying deletion decisions through a snapshot destroyer

use crate::decision::DecisionSet;
use rollup_core::{InputError, MutationError, SnapshotDestroyer};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Whether destroy calls are actually issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Decide and report only
    DryRun,
    /// Issue destroy calls
    Live,
}

impl RunMode {
    pub fn from_test_flag(test: bool) -> Self {
        if test {
            RunMode::DryRun
        } else {
            RunMode::Live
        }
    }

    pub fn is_live(self) -> bool {
        self == RunMode::Live
    }
}

/// Outcome of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    /// Deletions decided, in the order they were issued (or would have been)
    pub deletions: Vec<String>,
    /// Destroy calls that failed
    pub failures: Vec<MutationError>,
    /// Datasets skipped because of invalid input
    pub rejected: BTreeMap<String, InputError>,
}

impl RunReport {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            deletions: Vec::new(),
            failures: Vec::new(),
            rejected: BTreeMap::new(),
        }
    }

    /// True if nothing went wrong
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.rejected.is_empty()
    }

    /// Number of snapshots actually destroyed (0 in dry-run mode)
    pub fn destroyed(&self) -> usize {
        match self.mode {
            RunMode::DryRun => 0,
            RunMode::Live => self.deletions.len() - self.failures.len(),
        }
    }
}

/// Issue one destroy call per deletion, in decision order.
///
/// Failures are recorded and never retried; the remaining deletions proceed.
pub fn apply_decisions<D: SnapshotDestroyer>(
    set: &DecisionSet,
    destroyer: &D,
    mode: RunMode,
) -> RunReport {
    let mut report = RunReport::new(mode);
    report.rejected = set.rejected.clone();

    for decision in set.deletions() {
        let snap = &decision.snapshot;
        report.deletions.push(snap.full_name());

        if !mode.is_live() {
            continue;
        }

        match destroyer.destroy(&snap.dataset, &snap.name) {
            Ok(()) => info!(snapshot = %snap.full_name(), "Destroyed snapshot"),
            Err(err) => {
                warn!(error = %err, "Destroy failed");
                report.failures.push(err);
            }
        }
    }

    report
}
