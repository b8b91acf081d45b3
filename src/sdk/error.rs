//! SDK error classification
//!
//! SDK errors are opaque to the harness except for the class they fall
//! into, which drives retry decisions and is shown to the validator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure class of an SDK call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// Could not reach the service
    Connection,
    /// Transport or context deadline
    Timeout,
    /// Execution context was cancelled
    Cancelled,
    /// Service answered with an error status
    Service {
        status: u16,
        code: Option<String>,
        /// Explicit retryable marker surfaced by the SDK
        retryable: Option<bool>,
    },
    /// Request rejected before it was sent (missing parameter, bad value)
    Client,
    Other,
}

impl ErrorKind {
    pub fn service(status: u16) -> Self {
        ErrorKind::Service {
            status,
            code: None,
            retryable: None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ErrorKind::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Connection => write!(f, "connection"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::Service { status, code, .. } => match code {
                Some(code) => write!(f, "service {status} ({code})"),
                None => write!(f, "service {status}"),
            },
            ErrorKind::Client => write!(f, "client"),
            ErrorKind::Other => write!(f, "other"),
        }
    }
}

/// Error returned by an SDK invocation
pub trait ServiceError: std::error::Error + Send + Sync + 'static {
    fn kind(&self) -> ErrorKind;
}

/// Serializable view of a [`ServiceError`] for remote validators
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    #[serde(flatten)]
    pub kind: ErrorKind,
}

impl ErrorReport {
    pub fn from_error(err: &dyn ServiceError) -> Self {
        Self {
            message: err.to_string(),
            kind: err.kind(),
        }
    }
}
