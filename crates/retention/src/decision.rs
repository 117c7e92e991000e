//! Keep/delete verdicts and their diagnostics

use crate::tier::TierSpec;
use rollup_core::{InputError, SnapshotRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Final verdict for one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Keep,
    Delete,
}

/// Verdict for one snapshot, with the reasons it was kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub snapshot: SnapshotRecord,
    pub verdict: Verdict,
    /// Chronologically latest eligible snapshot of its dataset
    pub latest: bool,
    /// Names of the tiers that kept this snapshot
    pub kept_by: Vec<String>,
}

impl Decision {
    pub fn is_delete(&self) -> bool {
        self.verdict == Verdict::Delete
    }

    /// One flag per tier: the tier's abbreviation if it kept this snapshot,
    /// `-` otherwise (e.g. `h - w`)
    pub fn flags(&self, tiers: &[TierSpec]) -> String {
        tiers
            .iter()
            .map(|tier| {
                if self.kept_by.iter().any(|name| name == &tier.name) {
                    tier.abbreviation.as_str()
                } else {
                    "-"
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Decisions for one dataset, oldest snapshot first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetDecisions {
    pub dataset: String,
    pub decisions: Vec<Decision>,
    /// Highest ring occupancy per tier
    pub tier_peaks: BTreeMap<String, usize>,
}

impl DatasetDecisions {
    pub fn deletions(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(|d| d.is_delete())
    }

    pub fn kept(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(|d| !d.is_delete())
    }
}

/// Output of one evaluation pass over an inventory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecisionSet {
    pub datasets: Vec<DatasetDecisions>,
    /// Datasets whose input was invalid; no decisions were made for them
    pub rejected: BTreeMap<String, InputError>,
}

impl DecisionSet {
    /// Every deletion in dataset order, oldest first within a dataset
    pub fn deletions(&self) -> impl Iterator<Item = &Decision> {
        self.datasets.iter().flat_map(|d| d.deletions())
    }

    pub fn deletion_count(&self) -> usize {
        self.deletions().count()
    }

    pub fn get(&self, dataset: &str) -> Option<&DatasetDecisions> {
        self.datasets.iter().find(|d| d.dataset == dataset)
    }
}

/// Coalesce deletions into `zfs destroy` targets (`dataset@first%last`).
///
/// `all` must be every snapshot of the dataset in chronological order,
/// including ineligible ones: any snapshot not in `doomed` breaks a range so
/// that a range never covers something that is meant to survive.
pub fn destroy_ranges(
    dataset: &str,
    all: &[SnapshotRecord],
    doomed: &BTreeSet<&str>,
) -> Vec<String> {
    let mut targets = Vec::new();
    let mut run: Option<(&str, &str)> = None;

    let mut close = |run: &mut Option<(&str, &str)>| {
        if let Some((first, last)) = run.take() {
            if first == last {
                targets.push(format!("{}@{}", dataset, first));
            } else {
                targets.push(format!("{}@{}%{}", dataset, first, last));
            }
        }
    };

    for snap in all {
        if doomed.contains(snap.name.as_str()) {
            run = match run {
                Some((first, _)) => Some((first, snap.name.as_str())),
                None => Some((snap.name.as_str(), snap.name.as_str())),
            };
        } else {
            close(&mut run);
        }
    }
    close(&mut run);

    targets
}
