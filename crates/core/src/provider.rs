//! External collaborators: inventory provider and snapshot destroyer
//!
//! Both take `&self` so a single backend (e.g. the `zfs` command or a
//! [`MemoryInventory`](crate::MemoryInventory)) can serve both roles at once.

use crate::error::{MutationError, ProviderError};
use crate::inventory::Inventory;

/// Source of live snapshot inventories
pub trait InventoryProvider {
    /// Fetch every snapshot under `roots` (descendants included iff `recursive`).
    ///
    /// Must reflect destroys issued earlier in the same run.
    fn fetch_snapshots(
        &self,
        roots: &[String],
        recursive: bool,
    ) -> Result<Inventory, ProviderError>;
}

/// Primitive that destroys one snapshot
pub trait SnapshotDestroyer {
    fn destroy(&self, dataset: &str, name: &str) -> Result<(), MutationError>;
}

impl<T: InventoryProvider + ?Sized> InventoryProvider for &T {
    fn fetch_snapshots(
        &self,
        roots: &[String],
        recursive: bool,
    ) -> Result<Inventory, ProviderError> {
        (**self).fetch_snapshots(roots, recursive)
    }
}

impl<T: SnapshotDestroyer + ?Sized> SnapshotDestroyer for &T {
    fn destroy(&self, dataset: &str, name: &str) -> Result<(), MutationError> {
        (**self).destroy(dataset, name)
    }
}
