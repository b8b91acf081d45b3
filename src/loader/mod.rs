//! Recorded request loading
//!
//! A recorded batch is a JSON array of `{ContainerId, Request}` records.
//! Each record becomes a [`TypedRequestInfo`] for the operation's request
//! type, in recorded order.

mod batch;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use batch::{load_requests, CONTAINER_ID_FIELD, REQUEST_FIELD};

/// One recorded request, typed
#[derive(Clone, Debug)]
pub struct TypedRequestInfo<R> {
    pub container_id: String,
    pub request: R,
    /// Unknown top-level record fields, kept verbatim
    pub extra: Map<String, Value>,
}

/// Recorded batch could not be turned into typed requests
///
/// Record indices are 0-based positions in the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("recorded batch is not a JSON array: {0}")]
    Malformed(String),

    #[error("record {index}: not a JSON object")]
    NotAnObject { index: usize },

    #[error("record {index}: missing required field `{field}`")]
    MissingField { index: usize, field: String },

    #[error("record {index}: field `{field}` has the wrong shape: {reason}")]
    WrongShape {
        index: usize,
        field: String,
        reason: String,
    },

    #[error("record {index}: unknown field `{field}`")]
    UnknownField { index: usize, field: String },
}

impl LoadError {
    pub fn index(&self) -> Option<usize> {
        match self {
            LoadError::Malformed(_) => None,
            LoadError::NotAnObject { index }
            | LoadError::MissingField { index, .. }
            | LoadError::WrongShape { index, .. }
            | LoadError::UnknownField { index, .. } => Some(*index),
        }
    }
}

/// What to do with record fields the request type does not know
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFieldPolicy {
    /// One warning per distinct field per load
    #[default]
    Warn,
    Silent,
    /// Fail the load on the first unknown field
    Deny,
}

impl UnknownFieldPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "warn" | "warning" => Some(UnknownFieldPolicy::Warn),
            "silent" | "ignore" => Some(UnknownFieldPolicy::Silent),
            "deny" | "error" => Some(UnknownFieldPolicy::Deny),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoaderOptions {
    pub unknown_fields: UnknownFieldPolicy,
}

impl LoaderOptions {
    pub fn new(unknown_fields: UnknownFieldPolicy) -> Self {
        Self { unknown_fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_str() {
        assert_eq!(UnknownFieldPolicy::from_str("WARN"), Some(UnknownFieldPolicy::Warn));
        assert_eq!(UnknownFieldPolicy::from_str("silent"), Some(UnknownFieldPolicy::Silent));
        assert_eq!(UnknownFieldPolicy::from_str("deny"), Some(UnknownFieldPolicy::Deny));
        assert_eq!(UnknownFieldPolicy::from_str("loud"), None);
    }

    #[test]
    fn test_policy_serde() {
        let policy: UnknownFieldPolicy = serde_json::from_str("\"deny\"").unwrap();
        assert_eq!(policy, UnknownFieldPolicy::Deny);
        assert_eq!(serde_json::to_string(&UnknownFieldPolicy::Warn).unwrap(), "\"warn\"");
    }

    #[test]
    fn test_error_index() {
        assert_eq!(LoadError::Malformed("eof".into()).index(), None);
        assert_eq!(LoadError::NotAnObject { index: 0 }.index(), Some(0));
        let err = LoadError::MissingField {
            index: 3,
            field: "ContainerId".into(),
        };
        assert_eq!(err.index(), Some(3));
        assert_eq!(err.to_string(), "record 3: missing required field `ContainerId`");
    }
}
