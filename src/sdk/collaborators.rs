//! External collaborators consumed by the harness
//!
//! All three are read-mostly and shared across concurrently running
//! operations, so implementations must be `Send + Sync`.

use async_trait::async_trait;
use serde_json::Value;

use super::error::ServiceError;
use crate::error::{BoxError, StoreError};
use crate::models::OperationKey;

/// Decides which operations participate in a run
#[async_trait]
pub trait OperationRegistry: Send + Sync {
    /// A missing entry reports disabled; errors are reserved for I/O failures
    async fn is_enabled(&self, key: &OperationKey) -> Result<bool, BoxError>;
}

/// Source of recorded request batches
#[async_trait]
pub trait ReferenceDataStore: Send + Sync {
    /// Raw JSON array of recorded requests
    async fn get_requests(&self, key: &OperationKey) -> Result<Vec<u8>, StoreError>;
}

/// Judges a request/response/error tuple against reference data
#[async_trait]
pub trait Validator: Send + Sync {
    /// Empty message means accepted, a non-empty message is a diff
    async fn validate(
        &self,
        container_id: &str,
        request: &Value,
        response: &Value,
        error: Option<&dyn ServiceError>,
    ) -> Result<String, BoxError>;
}
