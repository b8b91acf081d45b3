//! Operation identity models
//!
//! An operation is addressed by its service and operation names. The same
//! key is used by the gate, the reference store and the validator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// (service, operation) pair used for enable/disable lookup
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationKey {
    pub service: String,
    pub operation: String,
}

impl OperationKey {
    pub fn new(service: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
        }
    }

    /// Parse `service.operation`
    pub fn parse(s: &str) -> Option<Self> {
        let (service, operation) = s.split_once('.')?;
        if service.is_empty() || operation.is_empty() {
            return None;
        }
        Some(Self::new(service, operation))
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service, self.operation)
    }
}

/// Operation plus the client kind that serves it
///
/// A service may expose several clients (`core` has `Compute`,
/// `Blockstorage`, `VirtualNetwork`, ...). The kind names the one the
/// client factory builds.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationSpec {
    pub key: OperationKey,
    pub client_kind: String,
}

impl OperationSpec {
    pub fn new(
        service: impl Into<String>,
        client_kind: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            key: OperationKey::new(service, operation),
            client_kind: client_kind.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.key.service
    }

    pub fn operation(&self) -> &str {
        &self.key.operation
    }
}

impl fmt::Display for OperationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} client)", self.key, self.client_kind)
    }
}
