//! Error taxonomy shared by the inventory, evaluator and pruner

use serde::Serialize;
use thiserror::Error;

/// Invalid input for a single dataset (or a single tier definition).
///
/// Aborts evaluation of the affected dataset only.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputError {
    #[error("invalid creation timestamp for {dataset}@{name}: {value:?}")]
    Timestamp {
        dataset: String,
        name: String,
        value: String,
    },

    #[error("invalid used-bytes value for {dataset}@{name}: {value:?}")]
    UsedBytes {
        dataset: String,
        name: String,
        value: String,
    },

    #[error("missing property `{property}` for {dataset}@{name}")]
    MissingProperty {
        dataset: String,
        name: String,
        property: String,
    },

    #[error("duplicate snapshot name {dataset}@{name}")]
    DuplicateName { dataset: String, name: String },

    #[error("invalid interval specification {spec:?}: {reason}")]
    Interval { spec: String, reason: String },

    #[error("duplicate tier name {name:?}")]
    DuplicateTier { name: String },
}

/// Failure of the inventory provider. Fatal to the whole run.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("malformed inventory line {line}: {content:?}")]
    Malformed { line: usize, content: String },
}

/// A single destroy call that did not succeed.
///
/// Recorded in the run report; never retried within the same run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("failed to destroy {dataset}@{name}: {reason}")]
pub struct MutationError {
    pub dataset: String,
    pub name: String,
    pub reason: String,
}

impl MutationError {
    pub fn new(dataset: &str, name: &str, reason: impl Into<String>) -> Self {
        Self {
            dataset: dataset.to_string(),
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
