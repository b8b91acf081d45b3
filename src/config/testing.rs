//! Testing target configuration
//!
//! Decides whether clients talk to a literal endpoint or to a region.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Testing configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("neither an endpoint nor a region is configured")]
    MissingTarget,

    #[error("endpoint is not an absolute URL: {0}")]
    InvalidEndpoint(String),
}

/// Endpoint and region used to point clients at the system under test
///
/// Endpoint wins when non-empty, otherwise the region drives host
/// resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestingConfig {
    /// Absolute URL overriding the resolved host
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Region identifier used when no endpoint is set
    #[serde(default)]
    pub region: Option<String>,
}

/// Where a client should send its requests
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientTarget {
    Endpoint(String),
    Region(String),
}

impl TestingConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            region: None,
        }
    }

    pub fn with_region(region: impl Into<String>) -> Self {
        Self {
            endpoint: None,
            region: Some(region.into()),
        }
    }

    /// Non-empty endpoint, if any
    pub fn endpoint(&self) -> Option<&str> {
        non_empty(self.endpoint.as_deref())
    }

    /// Non-empty region, if any
    pub fn region(&self) -> Option<&str> {
        non_empty(self.region.as_deref())
    }

    /// Resolve the selection rule
    pub fn target(&self) -> Result<ClientTarget, ConfigError> {
        if let Some(endpoint) = self.endpoint() {
            let url = Url::parse(endpoint)
                .map_err(|_| ConfigError::InvalidEndpoint(endpoint.to_string()))?;
            if url.cannot_be_a_base() || !url.has_host() {
                return Err(ConfigError::InvalidEndpoint(endpoint.to_string()));
            }
            return Ok(ClientTarget::Endpoint(endpoint.to_string()));
        }

        match self.region() {
            Some(region) => Ok(ClientTarget::Region(region.to_string())),
            None => Err(ConfigError::MissingTarget),
        }
    }

    /// Fill unset fields from `other`
    pub fn or(mut self, other: &TestingConfig) -> Self {
        if self.endpoint().is_none() {
            self.endpoint = other.endpoint.clone();
        }
        if self.region().is_none() {
            self.region = other.region.clone();
        }
        self
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
