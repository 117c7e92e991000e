//! Command integration tests

pub mod clear_empty;
pub mod config;
pub mod prune;
