//! In-memory collaborators
//!
//! Built up front by the host, read-only afterwards.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::error::{BoxError, StoreError};
use crate::models::OperationKey;
use crate::sdk::{OperationRegistry, ReferenceDataStore};

/// Registry holding explicit enable/disable entries
#[derive(Clone, Debug, Default)]
pub struct InMemoryRegistry {
    enabled: HashSet<OperationKey>,
    services: HashSet<String>,
    disabled: HashSet<OperationKey>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(mut self, service: &str, operation: &str) -> Self {
        self.enabled.insert(OperationKey::new(service, operation));
        self
    }

    /// Enable every operation of `service`
    pub fn enable_service(mut self, service: &str) -> Self {
        self.services.insert(service.to_string());
        self
    }

    /// Disabled entries win over enabled ones
    pub fn disable(mut self, service: &str, operation: &str) -> Self {
        self.disabled.insert(OperationKey::new(service, operation));
        self
    }

    pub fn contains(&self, key: &OperationKey) -> bool {
        !self.disabled.contains(key)
            && (self.enabled.contains(key) || self.services.contains(&key.service))
    }
}

#[async_trait]
impl OperationRegistry for InMemoryRegistry {
    async fn is_enabled(&self, key: &OperationKey) -> Result<bool, BoxError> {
        Ok(self.contains(key))
    }
}

/// Reference store holding recorded batches in memory
#[derive(Clone, Debug, Default)]
pub struct InMemoryReferenceStore {
    batches: HashMap<OperationKey, Vec<u8>>,
}

impl InMemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requests(mut self, key: OperationKey, body: impl Into<Vec<u8>>) -> Self {
        self.batches.insert(key, body.into());
        self
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

#[async_trait]
impl ReferenceDataStore for InMemoryReferenceStore {
    async fn get_requests(&self, key: &OperationKey) -> Result<Vec<u8>, StoreError> {
        self.batches
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::Missing(key.clone()))
    }
}
