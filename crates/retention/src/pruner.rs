//! Emptiness pruner
//!
//! Destroys zero-usage snapshots one per dataset per iteration, oldest
//! first. Destroying a snapshot can change the used space reported for its
//! neighbours, so every live iteration re-fetches the inventory before the
//! next decision. Dry runs fetch once and simulate each deletion by
//! removing it from the cached inventory, which yields the same sequence
//! of selections.
//!
//! ```text
//! Scanning ──> CandidateFound ──> Deleted ──> Scanning ...
//!     └──────> NoCandidate ──> Done
//! ```

use crate::apply::RunMode;
use rollup_core::{
    EligibilityFilter, InputError, Inventory, InventoryProvider, MutationError, ProviderError,
    SnapshotDestroyer, SnapshotRecord,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cooperative stop request, honoured between iterations
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pruner state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrunerState {
    /// About to observe the inventory
    Scanning,
    /// At most one candidate per dataset, waiting to be destroyed
    CandidateFound(Vec<SnapshotRecord>),
    /// Last scan found nothing to delete
    NoCandidate,
    /// Candidates of this iteration were handled
    Deleted,
    /// Terminal
    Done,
}

/// One selected deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrunerDecision {
    /// 1-based iteration in which the snapshot was selected
    pub iteration: usize,
    pub snapshot: SnapshotRecord,
}

/// Outcome of a pruner run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrunerReport {
    pub mode: RunMode,
    /// Iterations that selected at least one snapshot
    pub iterations: usize,
    /// Inventory observations (including the final empty one)
    pub scans: usize,
    pub decisions: Vec<PrunerDecision>,
    pub failures: Vec<MutationError>,
    pub rejected: BTreeMap<String, InputError>,
    /// Stopped on request before running out of candidates
    pub stopped: bool,
}

impl PrunerReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.rejected.is_empty()
    }

    /// `dataset@name` of every decision, in order
    pub fn deleted_names(&self) -> Vec<String> {
        self.decisions.iter().map(|d| d.snapshot.full_name()).collect()
    }
}

type SnapshotKey = (String, String);

fn key_of(snap: &SnapshotRecord) -> SnapshotKey {
    (snap.dataset.clone(), snap.name.clone())
}

/// Iterative empty-snapshot pruner
pub struct EmptinessPruner<P, D> {
    provider: P,
    destroyer: D,
    roots: Vec<String>,
    recursive: bool,
    filter: EligibilityFilter,
    mode: RunMode,
    stop: StopFlag,
    state: PrunerState,
    /// Snapshots this run already deleted (or simulated deleting)
    deleted: BTreeSet<SnapshotKey>,
    /// Snapshots whose destroy failed; never selected again
    failed: BTreeSet<SnapshotKey>,
    /// Dry-run inventory, fetched once
    cached: Option<Inventory>,
    iterations: usize,
    scans: usize,
    decisions: Vec<PrunerDecision>,
    failures: Vec<MutationError>,
    rejected: BTreeMap<String, InputError>,
    stopped: bool,
}

impl<P: InventoryProvider, D: SnapshotDestroyer> EmptinessPruner<P, D> {
    pub fn new(provider: P, destroyer: D, roots: Vec<String>) -> Self {
        Self {
            provider,
            destroyer,
            roots,
            recursive: false,
            filter: EligibilityFilter::default(),
            mode: RunMode::Live,
            stop: StopFlag::new(),
            state: PrunerState::Scanning,
            deleted: BTreeSet::new(),
            failed: BTreeSet::new(),
            cached: None,
            iterations: 0,
            scans: 0,
            decisions: Vec::new(),
            failures: Vec::new(),
            rejected: BTreeMap::new(),
            stopped: false,
        }
    }

    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: EligibilityFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn state(&self) -> &PrunerState {
        &self.state
    }

    /// Advance the state machine by one transition
    pub fn step(&mut self) -> Result<&PrunerState, ProviderError> {
        let next = match std::mem::replace(&mut self.state, PrunerState::Done) {
            PrunerState::Scanning => {
                let inventory = match self.observe() {
                    Ok(inventory) => inventory,
                    Err(err) => {
                        self.state = PrunerState::Scanning;
                        return Err(err);
                    }
                };
                let candidates = self.select(&inventory);
                if candidates.is_empty() {
                    debug!(scans = self.scans, "No empty snapshots left");
                    PrunerState::NoCandidate
                } else {
                    self.iterations += 1;
                    PrunerState::CandidateFound(candidates)
                }
            }
            PrunerState::CandidateFound(candidates) => {
                self.delete(candidates);
                PrunerState::Deleted
            }
            PrunerState::Deleted => {
                if self.stop.is_requested() {
                    info!(iterations = self.iterations, "Stop requested, ending run");
                    self.stopped = true;
                    PrunerState::Done
                } else {
                    PrunerState::Scanning
                }
            }
            PrunerState::NoCandidate | PrunerState::Done => PrunerState::Done,
        };

        self.state = next;
        Ok(&self.state)
    }

    /// Run until `Done`
    pub fn run(mut self) -> Result<PrunerReport, ProviderError> {
        while self.state != PrunerState::Done {
            self.step()?;
        }

        Ok(PrunerReport {
            mode: self.mode,
            iterations: self.iterations,
            scans: self.scans,
            decisions: self.decisions,
            failures: self.failures,
            rejected: self.rejected,
            stopped: self.stopped,
        })
    }

    /// Current inventory minus everything this run already handled
    fn observe(&mut self) -> Result<Inventory, ProviderError> {
        self.scans += 1;

        let cached = match self.mode {
            RunMode::DryRun => self.cached.clone(),
            RunMode::Live => None,
        };

        let fresh = match cached {
            Some(inventory) => inventory,
            None => {
                let inventory = self.provider.fetch_snapshots(&self.roots, self.recursive)?;
                for (dataset, err) in inventory.rejected() {
                    self.rejected.entry(dataset.clone()).or_insert_with(|| err.clone());
                }
                if self.mode == RunMode::DryRun {
                    self.cached = Some(inventory.clone());
                }
                inventory
            }
        };

        let handled: BTreeSet<SnapshotKey> = self.deleted.union(&self.failed).cloned().collect();
        Ok(fresh.without(&handled))
    }

    /// Oldest empty, unprotected, non-latest family snapshot of each dataset
    fn select(&self, inventory: &Inventory) -> Vec<SnapshotRecord> {
        let mut selected = Vec::new();

        for (dataset, snapshots) in inventory.datasets() {
            let family: Vec<&SnapshotRecord> =
                snapshots.iter().filter(|s| self.filter.in_family(s)).collect();

            let Some((_latest, older)) = family.split_last() else {
                continue;
            };

            if let Some(candidate) = older.iter().find(|s| s.is_empty() && !s.is_protected()) {
                debug!(dataset = %dataset, snapshot = %candidate.name, "Selected empty snapshot");
                selected.push((*candidate).clone());
            }
        }

        selected
    }

    fn delete(&mut self, candidates: Vec<SnapshotRecord>) {
        for snap in candidates {
            let key = key_of(&snap);

            if self.mode.is_live() {
                match self.destroyer.destroy(&snap.dataset, &snap.name) {
                    Ok(()) => {
                        info!(
                            snapshot = %snap.full_name(),
                            iteration = self.iterations,
                            "Destroyed empty snapshot"
                        );
                        self.deleted.insert(key);
                    }
                    Err(err) => {
                        warn!(error = %err, "Destroy failed");
                        self.failures.push(err);
                        self.failed.insert(key);
                    }
                }
            } else {
                info!(
                    snapshot = %snap.full_name(),
                    iteration = self.iterations,
                    "Would destroy empty snapshot"
                );
                self.deleted.insert(key);
            }

            self.decisions.push(PrunerDecision {
                iteration: self.iterations,
                snapshot: snap,
            });
        }
    }
}
