//! Snapshot inventory model for Rollup
//!
//! This crate provides:
//! - Strongly-typed snapshot records (creation time, used space, protection)
//! - Calendar bucket classification (hour/day/ISO week/month/year)
//! - Inventory container and `zfs get -Hp` output parsing
//! - Eligibility filtering by automated name prefix
//! - Inventory provider / snapshot destroyer traits
//! - In-memory inventory for simulation and tests

pub mod bucket;
pub mod error;
pub mod filter;
pub mod inventory;
pub mod memory;
pub mod provider;
pub mod snapshot;

// Re-exports
pub use bucket::Granularity;
pub use error::{InputError, MutationError, ProviderError};
pub use filter::EligibilityFilter;
pub use inventory::{parse_zfs_get, Inventory};
pub use memory::MemoryInventory;
pub use provider::{InventoryProvider, SnapshotDestroyer};
pub use snapshot::{Protection, SnapshotRecord};
