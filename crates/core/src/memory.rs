//! In-memory inventory backend
//!
//! Implements both [`InventoryProvider`] and [`SnapshotDestroyer`]: destroying
//! a snapshot removes it from every later fetch. Used for dry-run simulation
//! and as a fake backend in tests.

use crate::error::{MutationError, ProviderError};
use crate::inventory::Inventory;
use crate::provider::{InventoryProvider, SnapshotDestroyer};
use crate::snapshot::SnapshotRecord;
use parking_lot::Mutex;
use std::collections::BTreeSet;

/// Mutable in-memory snapshot store
#[derive(Debug, Default)]
pub struct MemoryInventory {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    snapshots: Vec<SnapshotRecord>,
    /// Full names whose destroy call should fail
    failing: BTreeSet<String>,
    /// Every destroy call, in order, successful or not
    destroy_log: Vec<String>,
    fetch_count: usize,
}

impl MemoryInventory {
    pub fn new(snapshots: impl IntoIterator<Item = SnapshotRecord>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                snapshots: snapshots.into_iter().collect(),
                ..Default::default()
            }),
        }
    }

    /// Make destroy calls for `dataset@name` fail
    pub fn fail_destroy(&self, dataset: &str, name: &str) {
        self.state.lock().failing.insert(format!("{}@{}", dataset, name));
    }

    /// Change the reported used space of a snapshot
    pub fn set_used(&self, dataset: &str, name: &str, used_bytes: u64) {
        let mut state = self.state.lock();
        if let Some(snap) = state
            .snapshots
            .iter_mut()
            .find(|s| s.dataset == dataset && s.name == name)
        {
            snap.used_bytes = used_bytes;
        }
    }

    pub fn destroy_log(&self) -> Vec<String> {
        self.state.lock().destroy_log.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().fetch_count
    }

    pub fn snapshot_names(&self) -> Vec<String> {
        self.state.lock().snapshots.iter().map(SnapshotRecord::full_name).collect()
    }
}

fn under_root(dataset: &str, root: &str, recursive: bool) -> bool {
    dataset == root
        || (recursive
            && dataset
                .strip_prefix(root)
                .is_some_and(|rest| rest.starts_with('/')))
}

impl InventoryProvider for MemoryInventory {
    fn fetch_snapshots(
        &self,
        roots: &[String],
        recursive: bool,
    ) -> Result<Inventory, ProviderError> {
        let mut state = self.state.lock();
        state.fetch_count += 1;

        let mut inventory = Inventory::new();
        for root in roots {
            inventory.ensure_dataset(root);
        }
        for snap in &state.snapshots {
            if roots.iter().any(|root| under_root(&snap.dataset, root, recursive)) {
                inventory.insert(snap.clone());
            }
        }
        Ok(inventory)
    }
}

impl SnapshotDestroyer for MemoryInventory {
    fn destroy(&self, dataset: &str, name: &str) -> Result<(), MutationError> {
        let mut state = self.state.lock();
        let full_name = format!("{}@{}", dataset, name);
        state.destroy_log.push(full_name.clone());

        if state.failing.contains(&full_name) {
            return Err(MutationError::new(dataset, name, "injected failure"));
        }

        let before = state.snapshots.len();
        state.snapshots.retain(|s| !(s.dataset == dataset && s.name == name));
        if state.snapshots.len() == before {
            return Err(MutationError::new(dataset, name, "snapshot does not exist"));
        }
        Ok(())
    }
}
