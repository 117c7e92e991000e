//! Retention evaluator
//!
//! Runs every tier of a [`RetentionPolicy`] over each dataset's eligible
//! snapshots and combines them with the never-delete-the-latest rule:
//! a snapshot is kept iff it is the latest one or any tier kept it.

use crate::decision::{DatasetDecisions, Decision, DecisionSet, Verdict};
use crate::policy::RetentionPolicy;
use crate::tier::{TierKind, TierSpec};
use rollup_core::{InputError, Inventory, SnapshotRecord};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Evaluates a retention policy against snapshot inventories
pub struct RetentionEvaluator<'p> {
    policy: &'p RetentionPolicy,
}

impl<'p> RetentionEvaluator<'p> {
    pub fn new(policy: &'p RetentionPolicy) -> Self {
        Self { policy }
    }

    /// Evaluate every dataset of an (already filtered) inventory.
    ///
    /// Datasets without snapshots produce no entry; rejected datasets are
    /// carried over untouched.
    pub fn evaluate(&self, inventory: &Inventory) -> DecisionSet {
        let mut set = DecisionSet {
            datasets: Vec::new(),
            rejected: inventory.rejected().clone(),
        };

        for (dataset, snapshots) in inventory.datasets() {
            if snapshots.is_empty() {
                continue;
            }
            match self.evaluate_dataset(dataset, snapshots) {
                Ok(decisions) => set.datasets.push(decisions),
                Err(err) => {
                    set.rejected.insert(dataset.to_string(), err);
                }
            }
        }

        set
    }

    /// Evaluate one dataset's eligible snapshots (any order).
    pub fn evaluate_dataset(
        &self,
        dataset: &str,
        snapshots: &[SnapshotRecord],
    ) -> Result<DatasetDecisions, InputError> {
        let mut sorted = snapshots.to_vec();
        sorted.sort_by(SnapshotRecord::chronological);

        let mut names = HashSet::new();
        for snap in &sorted {
            if !names.insert(snap.name.as_str()) {
                return Err(InputError::DuplicateName {
                    dataset: dataset.to_string(),
                    name: snap.name.clone(),
                });
            }
        }

        let mut kept_by: Vec<Vec<String>> = vec![Vec::new(); sorted.len()];
        let mut tier_peaks = BTreeMap::new();

        for tier in self.policy.tiers() {
            let candidates = self.candidates(&sorted, tier);
            let selection = tier.select(&sorted, &candidates, self.policy.representative());

            for idx in &selection.kept {
                kept_by[*idx].push(tier.name.clone());
            }
            tier_peaks.insert(tier.name.clone(), selection.peak_occupancy);

            debug!(
                dataset = %dataset,
                tier = %tier.name,
                candidates = candidates.len(),
                kept = selection.kept.len(),
                "Evaluated tier"
            );
        }

        let latest = sorted.len().saturating_sub(1);
        let decisions: Vec<Decision> = sorted
            .into_iter()
            .zip(kept_by)
            .enumerate()
            .map(|(idx, (snapshot, kept_by))| {
                let is_latest = idx == latest;
                let verdict = if is_latest || !kept_by.is_empty() {
                    Verdict::Keep
                } else {
                    Verdict::Delete
                };
                Decision {
                    snapshot,
                    verdict,
                    latest: is_latest,
                    kept_by,
                }
            })
            .collect();

        let result = DatasetDecisions {
            dataset: dataset.to_string(),
            decisions,
            tier_peaks,
        };

        info!(
            dataset = %dataset,
            snapshots = result.decisions.len(),
            delete = result.deletions().count(),
            "Evaluated dataset"
        );

        Ok(result)
    }

    /// Indices of snapshots allowed into this tier's buckets.
    ///
    /// With empty pruning on, zero-usage snapshots other than the latest are
    /// left out, except in calendar buckets that have nothing else.
    fn candidates(&self, sorted: &[SnapshotRecord], tier: &TierSpec) -> Vec<usize> {
        let latest = sorted.len().saturating_sub(1);
        let counts = |idx: usize| idx == latest || !sorted[idx].is_empty();

        if !self.policy.prune_empty() {
            return (0..sorted.len()).collect();
        }

        match tier.kind {
            TierKind::Periodic { .. } => (0..sorted.len()).filter(|&idx| counts(idx)).collect(),
            TierKind::Calendar { granularity } => {
                let keys: Vec<String> = sorted
                    .iter()
                    .map(|s| granularity.bucket_key(&s.created_at))
                    .collect();
                let occupied: HashSet<&str> = (0..sorted.len())
                    .filter(|&idx| counts(idx))
                    .map(|idx| keys[idx].as_str())
                    .collect();

                (0..sorted.len())
                    .filter(|&idx| counts(idx) || !occupied.contains(keys[idx].as_str()))
                    .collect()
            }
        }
    }
}
