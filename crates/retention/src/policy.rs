//! Immutable retention policy
//!
//! Built once per run from configuration and passed by reference into the
//! evaluator.

use crate::tier::{Representative, TierSpec};
use rollup_core::{Granularity, InputError};
use serde::Serialize;
use std::collections::HashSet;

/// Retention policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetentionPolicy {
    /// Active tiers, sorted by name
    tiers: Vec<TierSpec>,
    /// Calendar bucket representative
    representative: Representative,
    /// Exclude empty, non-latest snapshots from bucket candidacy
    prune_empty: bool,
}

impl Default for RetentionPolicy {
    /// Time Machine style: hourly for a day, daily for a week, weekly forever
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            representative: Representative::First,
            prune_empty: false,
        }
    }
}

/// Built-in tiers used when none are configured
pub fn default_tiers() -> Vec<TierSpec> {
    vec![
        TierSpec::calendar("daily", "d", Granularity::Day, 7),
        TierSpec::calendar("hourly", "h", Granularity::Hour, 24),
        TierSpec::calendar("weekly", "w", Granularity::Week, 0),
    ]
}

impl RetentionPolicy {
    /// Create a policy from tier specs. Tier names must be unique.
    pub fn new(tiers: Vec<TierSpec>) -> Result<Self, InputError> {
        let mut seen = HashSet::new();
        for tier in &tiers {
            tier.validate()?;
            if !seen.insert(tier.name.as_str()) {
                return Err(InputError::DuplicateTier {
                    name: tier.name.clone(),
                });
            }
        }

        let mut tiers = tiers;
        tiers.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            tiers,
            ..Self::default()
        })
    }

    /// Sets the calendar bucket representative.
    #[must_use]
    pub fn with_representative(mut self, representative: Representative) -> Self {
        self.representative = representative;
        self
    }

    /// Sets empty-snapshot exclusion from bucket candidacy.
    #[must_use]
    pub fn with_prune_empty(mut self, prune_empty: bool) -> Self {
        self.prune_empty = prune_empty;
        self
    }

    pub fn tiers(&self) -> &[TierSpec] {
        &self.tiers
    }

    pub fn representative(&self) -> Representative {
        self.representative
    }

    pub fn prune_empty(&self) -> bool {
        self.prune_empty
    }
}
