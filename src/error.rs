//! Harness error taxonomy
//!
//! Errors that abort a scenario as a whole. Per-request outcomes
//! (validation diffs, validator failures, panics, cancellation) are
//! recorded in [`crate::models::RequestResult`] instead.

use thiserror::Error;

use crate::config::ConfigError;
use crate::loader::LoadError;
use crate::models::OperationKey;

/// Boxed error returned by external collaborators
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Reference data store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no recorded requests for {0}")]
    Missing(OperationKey),

    #[error("failed to read recorded requests: {0}")]
    Io(#[from] std::io::Error),

    #[error("reference data service failed: {0}")]
    Service(String),
}

/// Errors that abort a scenario before or while preparing its requests
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("invalid testing configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to construct {kind} client for {key}: {source}")]
    ClientConstruction {
        key: OperationKey,
        kind: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to query operation registry for {key}: {source}")]
    Gate {
        key: OperationKey,
        #[source]
        source: BoxError,
    },

    #[error("failed to fetch recorded requests for {key}: {source}")]
    ReferenceData {
        key: OperationKey,
        #[source]
        source: StoreError,
    },

    #[error("failed to load recorded requests for {key}: {source}")]
    Load {
        key: OperationKey,
        #[source]
        source: LoadError,
    },
}

impl HarnessError {
    /// Operation the error belongs to, when known
    pub fn key(&self) -> Option<&OperationKey> {
        match self {
            HarnessError::Config(_) => None,
            HarnessError::ClientConstruction { key, .. }
            | HarnessError::Gate { key, .. }
            | HarnessError::ReferenceData { key, .. }
            | HarnessError::Load { key, .. } => Some(key),
        }
    }
}
