//! Snapshot inventory grouped by dataset
//!
//! Snapshots are kept sorted chronologically per dataset. A dataset whose
//! input fails validation is moved to the rejected set and carries its
//! [`InputError`] instead of snapshots, so other datasets can proceed.

use crate::error::{InputError, ProviderError};
use crate::snapshot::{Protection, SnapshotRecord};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Snapshot inventory for one or more datasets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    datasets: BTreeMap<String, Vec<SnapshotRecord>>,
    rejected: BTreeMap<String, InputError>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an inventory from unordered records
    pub fn from_records(records: impl IntoIterator<Item = SnapshotRecord>) -> Self {
        let mut inventory = Self::new();
        for record in records {
            inventory.insert(record);
        }
        inventory
    }

    /// Insert a record in chronological position.
    ///
    /// A duplicate name rejects the whole dataset.
    pub fn insert(&mut self, record: SnapshotRecord) {
        if self.rejected.contains_key(&record.dataset) {
            return;
        }

        let snapshots = self.datasets.entry(record.dataset.clone()).or_default();
        if snapshots.iter().any(|s| s.name == record.name) {
            let err = InputError::DuplicateName {
                dataset: record.dataset.clone(),
                name: record.name.clone(),
            };
            self.reject(&record.dataset, err);
            return;
        }

        let pos = snapshots.partition_point(|s| s.chronological(&record).is_lt());
        snapshots.insert(pos, record);
    }

    /// Mark a dataset as unusable for this run
    pub fn reject(&mut self, dataset: &str, err: InputError) {
        warn!(dataset = %dataset, error = %err, "Rejecting dataset");
        self.datasets.remove(dataset);
        self.rejected.entry(dataset.to_string()).or_insert(err);
    }

    /// Register a dataset that has no snapshots
    pub fn ensure_dataset(&mut self, dataset: &str) {
        if !self.rejected.contains_key(dataset) {
            self.datasets.entry(dataset.to_string()).or_default();
        }
    }

    /// Take datasets from `other` that this inventory has not seen yet
    pub fn absorb(&mut self, other: Inventory) {
        for (dataset, snapshots) in other.datasets {
            if self.datasets.contains_key(&dataset) || self.rejected.contains_key(&dataset) {
                continue;
            }
            self.datasets.insert(dataset, snapshots);
        }
        for (dataset, err) in other.rejected {
            if !self.datasets.contains_key(&dataset) {
                self.rejected.entry(dataset).or_insert(err);
            }
        }
    }

    /// Remove a snapshot, returning it if present
    pub fn remove(&mut self, dataset: &str, name: &str) -> Option<SnapshotRecord> {
        let snapshots = self.datasets.get_mut(dataset)?;
        let pos = snapshots.iter().position(|s| s.name == name)?;
        Some(snapshots.remove(pos))
    }

    /// Copy of this inventory without the given `(dataset, name)` pairs
    pub fn without(&self, excluded: &BTreeSet<(String, String)>) -> Inventory {
        let mut copy = self.clone();
        for (dataset, name) in excluded {
            copy.remove(dataset, name);
        }
        copy
    }

    /// Datasets in lexical order with their chronologically sorted snapshots
    pub fn datasets(&self) -> impl Iterator<Item = (&str, &[SnapshotRecord])> {
        self.datasets
            .iter()
            .map(|(name, snapshots)| (name.as_str(), snapshots.as_slice()))
    }

    pub fn get(&self, dataset: &str) -> Option<&[SnapshotRecord]> {
        self.datasets.get(dataset).map(Vec::as_slice)
    }

    pub fn rejected(&self) -> &BTreeMap<String, InputError> {
        &self.rejected
    }

    /// Total number of snapshots across accepted datasets
    pub fn len(&self) -> usize {
        self.datasets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only the snapshots matching `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&SnapshotRecord) -> bool) {
        for snapshots in self.datasets.values_mut() {
            snapshots.retain(|s| keep(s));
        }
    }
}

/// Parse the output of
/// `zfs get -t snapshot -Hp[r]o name,property,value type,creation,used,<protection> <root>`.
///
/// Without `recursive`, snapshots of descendant datasets are skipped.
pub fn parse_zfs_get(
    output: &str,
    root: &str,
    recursive: bool,
    protection_property: &str,
) -> Result<Inventory, ProviderError> {
    let mut properties: BTreeMap<(String, String), BTreeMap<String, String>> = BTreeMap::new();

    for (idx, line) in output.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.splitn(3, '\t');
        let (name, property, value) = match (fields.next(), fields.next(), fields.next()) {
            (Some(n), Some(p), Some(v)) => (n, p, v),
            _ => {
                return Err(ProviderError::Malformed {
                    line: idx + 1,
                    content: line.to_string(),
                })
            }
        };

        // Only snapshots carry an '@'
        let Some((dataset, snapshot)) = name.split_once('@') else {
            continue;
        };

        if !recursive && dataset != root {
            continue;
        }

        properties
            .entry((dataset.to_string(), snapshot.to_string()))
            .or_default()
            .insert(property.to_string(), value.to_string());
    }

    let mut inventory = Inventory::new();
    if !recursive {
        inventory.ensure_dataset(root);
    }

    for ((dataset, name), props) in properties {
        if props.get("type").is_some_and(|t| t != "snapshot") {
            continue;
        }
        inventory.ensure_dataset(&dataset);

        match record_from_properties(&dataset, &name, &props, protection_property) {
            Ok(record) => inventory.insert(record),
            Err(err) => inventory.reject(&dataset, err),
        }
    }

    debug!(
        root = %root,
        snapshots = inventory.len(),
        rejected = inventory.rejected().len(),
        "Parsed zfs inventory"
    );

    Ok(inventory)
}

fn record_from_properties(
    dataset: &str,
    name: &str,
    props: &BTreeMap<String, String>,
    protection_property: &str,
) -> Result<SnapshotRecord, InputError> {
    let missing = |property: &str| InputError::MissingProperty {
        dataset: dataset.to_string(),
        name: name.to_string(),
        property: property.to_string(),
    };

    let creation = props.get("creation").ok_or_else(|| missing("creation"))?;
    let used = props.get("used").ok_or_else(|| missing("used"))?;

    let bad_timestamp = || InputError::Timestamp {
        dataset: dataset.to_string(),
        name: name.to_string(),
        value: creation.clone(),
    };
    let epoch: i64 = creation.trim().parse().map_err(|_| bad_timestamp())?;

    let used_bytes: u64 = used.trim().parse().map_err(|_| InputError::UsedBytes {
        dataset: dataset.to_string(),
        name: name.to_string(),
        value: used.clone(),
    })?;

    let protection = props
        .get(protection_property)
        .map(|v| Protection::from_property(v))
        .unwrap_or_default();

    let record =
        SnapshotRecord::at_epoch(dataset, name, epoch, used_bytes).ok_or_else(bad_timestamp)?;
    Ok(record.with_protection(protection))
}
