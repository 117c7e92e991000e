//! Snapshot retention decisions
//!
//! This crate provides:
//! - Retention tiers (calendar buckets and fixed periods)
//! - Bounded bucket rings
//! - The retention evaluator (tiers + never-delete-the-latest)
//! - Applying decisions through a snapshot destroyer
//! - The iterative emptiness pruner

pub mod apply;
pub mod decision;
pub mod evaluator;
pub mod policy;
pub mod pruner;
pub mod ring;
pub mod tier;

// Re-exports
pub use apply::{apply_decisions, RunMode, RunReport};
pub use decision::{destroy_ranges, DatasetDecisions, Decision, DecisionSet, Verdict};
pub use evaluator::RetentionEvaluator;
pub use policy::{default_tiers, RetentionPolicy};
pub use pruner::{EmptinessPruner, PrunerDecision, PrunerReport, PrunerState, StopFlag};
pub use ring::{AnchorRing, BucketRing};
pub use tier::{format_period, parse_period, Representative, TierKind, TierSelection, TierSpec};
