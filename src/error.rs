//! Error types, one enum per concern.
//!
//! Library code returns these; the binary wraps them with `anyhow` context.

use thiserror::Error;

use crate::models::ChangeStatus;
use crate::models::ResourceKind;
use crate::validation::ValidationError;

/// Failure loading planner configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

/// Failure reading or writing the job store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Job '{0}' not found")]
    JobNotFound(String),
    #[error("Pending change {0} not found")]
    PendingNotFound(u64),
    #[error("Job '{job_id}' was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        job_id: String,
        expected: u64,
        found: u64,
    },
    #[error("Pending change {id} is {actual}, expected {expected}")]
    StateConflict {
        id: u64,
        expected: ChangeStatus,
        actual: ChangeStatus,
    },
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Failure of a planning pass. Nothing is written when one is returned.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Invalid planning input: {}", summarize(.0))]
    InvalidInput(Vec<ValidationError>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure proposing, approving or rejecting a change.
#[derive(Debug, Error)]
pub enum ArbitrationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Job '{0}' has no plan")]
    JobNotPlanned(String),
    #[error("Job '{job_id}' has no {kind} blocks")]
    NoBlocksForKind { job_id: String, kind: ResourceKind },
    #[error("Duration must be at least one minute")]
    InvalidDuration,
    #[error("Change starting {0} ends past the supported date range")]
    OutOfRange(chrono::NaiveDateTime),
    #[error("Pending change {id} is already {status}")]
    AlreadyResolved { id: u64, status: ChangeStatus },
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
