//! Retention tiers
//!
//! A tier walks a dataset's candidate snapshots oldest to newest and
//! decides which of them it keeps:
//! - calendar tiers keep one representative per calendar bucket, for at
//!   most `capacity` of the newest buckets
//! - periodic tiers keep a snapshot whenever at least 90% of the period has
//!   elapsed since the previous one they kept

use crate::ring::{AnchorRing, BucketRing};
use chrono::{DateTime, Utc};
use rollup_core::{Granularity, InputError, SnapshotRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

/// Fraction of a period (numerator, denominator) that must elapse between
/// two snapshots kept by a periodic tier. Absorbs scheduling jitter.
pub const PERIOD_TOLERANCE: (i128, i128) = (9, 10);

/// Which snapshot of a calendar bucket represents it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representative {
    /// Oldest snapshot placed into the bucket (stable under re-evaluation)
    #[default]
    First,
    /// Newest snapshot placed into the bucket
    Last,
}

impl Representative {
    pub fn as_str(self) -> &'static str {
        match self {
            Representative::First => "first",
            Representative::Last => "last",
        }
    }
}

/// What a tier measures time in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TierKind {
    Calendar { granularity: Granularity },
    Periodic { period_secs: u64 },
}

/// One named retention rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierSpec {
    pub name: String,
    /// Short label for diagnostics (e.g. `h`, `d`, `w`)
    pub abbreviation: String,
    pub kind: TierKind,
    /// Maximum number of buckets/anchors held; 0 = unbounded
    pub capacity: usize,
}

/// Result of running one tier over one dataset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierSelection {
    /// Indices (into the dataset's snapshot slice) kept by this tier
    pub kept: BTreeSet<usize>,
    /// Highest ring occupancy during the pass
    pub peak_occupancy: usize,
}

impl TierSpec {
    pub fn calendar(
        name: &str,
        abbreviation: &str,
        granularity: Granularity,
        capacity: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            kind: TierKind::Calendar { granularity },
            capacity,
        }
    }

    pub fn periodic(name: &str, abbreviation: &str, period_secs: u64, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            kind: TierKind::Periodic { period_secs },
            capacity,
        }
    }

    /// Reject specs that can never select anything sensible
    pub fn validate(&self) -> Result<(), InputError> {
        if let TierKind::Periodic { period_secs: 0 } = self.kind {
            return Err(InputError::Interval {
                spec: self.name.clone(),
                reason: "period must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Run this tier over `snapshots`, considering only the `candidates`
    /// indices (ascending, i.e. oldest first).
    pub fn select(
        &self,
        snapshots: &[SnapshotRecord],
        candidates: &[usize],
        representative: Representative,
    ) -> TierSelection {
        let selection = match self.kind {
            TierKind::Calendar { granularity } => {
                select_calendar(snapshots, candidates, granularity, self.capacity, representative)
            }
            TierKind::Periodic { period_secs } => {
                select_periodic(snapshots, candidates, period_secs, self.capacity)
            }
        };

        trace!(
            tier = %self.name,
            candidates = candidates.len(),
            kept = selection.kept.len(),
            peak = selection.peak_occupancy,
            "Tier pass complete"
        );
        selection
    }
}

impl fmt::Display for TierSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let capacity = if self.capacity == 0 {
            "unbounded".to_string()
        } else {
            self.capacity.to_string()
        };
        match &self.kind {
            TierKind::Calendar { granularity } => {
                write!(
                    f,
                    "{} ({}): per {}, keep {}",
                    self.name, self.abbreviation, granularity, capacity
                )
            }
            TierKind::Periodic { period_secs } => write!(
                f,
                "{} ({}): every {}, keep {}",
                self.name,
                self.abbreviation,
                format_period(*period_secs),
                capacity
            ),
        }
    }
}

fn select_calendar(
    snapshots: &[SnapshotRecord],
    candidates: &[usize],
    granularity: Granularity,
    capacity: usize,
    representative: Representative,
) -> TierSelection {
    let mut ring: BucketRing<usize> = BucketRing::new(capacity);

    for &idx in candidates {
        let key = granularity.bucket_key(&snapshots[idx].created_at);

        if ring.contains(&key) && representative == Representative::First {
            continue;
        }

        if let Some((evicted, _)) = ring.insert(key, idx) {
            trace!(bucket = %evicted, "Evicted bucket");
        }
    }

    let peak_occupancy = ring.peak();
    TierSelection {
        kept: ring.into_values().collect(),
        peak_occupancy,
    }
}

fn select_periodic(
    snapshots: &[SnapshotRecord],
    candidates: &[usize],
    period_secs: u64,
    capacity: usize,
) -> TierSelection {
    let mut ring = AnchorRing::new(capacity);
    let mut kept = BTreeSet::new();

    for &idx in candidates {
        let ts = snapshots[idx].created_at;
        let due = match ring.latest() {
            None => true,
            Some(anchor) => period_elapsed(anchor, &ts, period_secs),
        };

        if due {
            ring.push(ts);
            kept.insert(idx);
        }
    }

    TierSelection {
        kept,
        peak_occupancy: ring.peak(),
    }
}

/// True if at least 90% of `period_secs` separates `anchor` and `ts`
fn period_elapsed(anchor: &DateTime<Utc>, ts: &DateTime<Utc>, period_secs: u64) -> bool {
    let elapsed_ms = i128::from((*ts - *anchor).num_milliseconds());
    let period_ms = i128::from(period_secs) * 1000;
    let (num, den) = PERIOD_TOLERANCE;
    elapsed_ms * den >= period_ms * num
}

/// Parse an interval: bare seconds (`900`) or a number with a unit suffix
/// (`90s`, `15m`, `4h`, `1d`, `2w`).
pub fn parse_period(spec: &str) -> Result<u64, InputError> {
    let invalid = |reason: &str| InputError::Interval {
        spec: spec.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = spec.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    if digits.is_empty() {
        return Err(invalid("expected a number"));
    }
    let value: u64 = digits.parse().map_err(|_| invalid("number out of range"))?;

    let multiplier = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        "w" => 604_800,
        _ => return Err(invalid("unknown unit (use s, m, h, d or w)")),
    };

    let secs = value
        .checked_mul(multiplier)
        .ok_or_else(|| invalid("number out of range"))?;
    if secs == 0 {
        return Err(invalid("period must be positive"));
    }
    Ok(secs)
}

/// Inverse of [`parse_period`] using the largest whole unit
pub fn format_period(secs: u64) -> String {
    for (unit, size) in [("w", 604_800), ("d", 86_400), ("h", 3600), ("m", 60)] {
        if secs >= size && secs % size == 0 {
            return format!("{}{}", secs / size, unit);
        }
    }
    format!("{}s", secs)
}
