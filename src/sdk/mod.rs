//! SDK seams
//!
//! Traits the generated clients, requests and responses implement, the
//! execution context passed into every call, and the collaborator
//! interfaces the harness consumes.

mod client;
mod collaborators;
mod context;
mod error;
mod request;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{ClientFactory, ConfigurationProvider, ServiceClient, StaticConfigurationProvider};
pub use collaborators::{OperationRegistry, ReferenceDataStore, Validator};
pub use context::{CancelHandle, ContextError, ExecutionContext};
pub use error::{ErrorKind, ErrorReport, ServiceError};
pub use request::{PaginatedRequest, PaginatedResponse, SdkRequest};
