//! Common utilities for integration tests

pub mod cli;
pub mod fake_zfs;

// Re-export commonly used items
pub use fake_zfs::{FakeSnapshot, FakeZfs};
