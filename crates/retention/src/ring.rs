//! Bounded bucket rings
//!
//! One ring per (dataset, tier), created fresh for every evaluation pass.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};

/// Ordered bucket-key -> representative mapping with bounded occupancy.
///
/// Inserting a new key into a full ring evicts the lexically oldest key
/// first. A capacity of 0 means unbounded.
#[derive(Debug, Clone)]
pub struct BucketRing<V> {
    capacity: usize,
    slots: BTreeMap<String, V>,
    peak: usize,
}

impl<V> BucketRing<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: BTreeMap::new(),
            peak: 0,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.slots.len() >= self.capacity
    }

    /// Insert a new key, returning the evicted bucket if the ring was full.
    ///
    /// An existing key is overwritten in place and never evicts.
    pub fn insert(&mut self, key: String, value: V) -> Option<(String, V)> {
        if let Some(slot) = self.slots.get_mut(&key) {
            *slot = value;
            return None;
        }

        let evicted = if self.is_full() {
            self.slots.pop_first()
        } else {
            None
        };

        self.slots.insert(key, value);
        self.peak = self.peak.max(self.slots.len());
        evicted
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.slots.get(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Highest occupancy seen since creation
    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_values(self) -> impl Iterator<Item = V> {
        self.slots.into_values()
    }
}

/// Anchors of a periodic tier, oldest first.
///
/// Only bounds how many anchors are remembered; dropping an anchor never
/// changes a verdict already assigned.
#[derive(Debug, Clone)]
pub struct AnchorRing {
    capacity: usize,
    anchors: VecDeque<DateTime<Utc>>,
    peak: usize,
}

impl AnchorRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            anchors: VecDeque::new(),
            peak: 0,
        }
    }

    /// Most recent anchor
    pub fn latest(&self) -> Option<&DateTime<Utc>> {
        self.anchors.back()
    }

    pub fn push(&mut self, anchor: DateTime<Utc>) {
        self.anchors.push_back(anchor);
        if self.capacity > 0 && self.anchors.len() > self.capacity {
            self.anchors.pop_front();
        }
        self.peak = self.peak.max(self.anchors.len());
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn peak(&self) -> usize {
        self.peak
    }
}
