//! Client-side seams
//!
//! A service client is opaque to the harness apart from its host and
//! region. Each operation supplies a factory that knows the concrete
//! constructor.

use serde::{Deserialize, Serialize};

use crate::config::TestingConfig;
use crate::error::BoxError;

/// Capability set shared by every generated service client
pub trait ServiceClient: Send + Sync {
    /// Override the resolved host with a literal endpoint
    fn set_host(&mut self, host: &str);

    /// Resolve the host from a region identifier
    fn set_region(&mut self, region: &str);

    fn host(&self) -> &str;
}

/// Credentials and defaults used by client constructors
pub trait ConfigurationProvider: Send + Sync {
    fn tenancy(&self) -> Result<String, BoxError>;
    fn user(&self) -> Result<String, BoxError>;
    fn key_fingerprint(&self) -> Result<String, BoxError>;
    /// PEM encoded signing key
    fn private_key(&self) -> Result<String, BoxError>;
    fn region(&self) -> Result<String, BoxError>;
}

/// Configuration provider with fixed values
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StaticConfigurationProvider {
    pub tenancy: String,
    pub user: String,
    pub fingerprint: String,
    pub private_key: String,
    pub region: String,
}

impl StaticConfigurationProvider {
    pub fn new(tenancy: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            tenancy: tenancy.into(),
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn with_key(mut self, fingerprint: impl Into<String>, pem: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self.private_key = pem.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }
}

fn required(name: &str, value: &str) -> Result<String, BoxError> {
    if value.is_empty() {
        Err(format!("configuration provider has no {name}").into())
    } else {
        Ok(value.to_string())
    }
}

impl ConfigurationProvider for StaticConfigurationProvider {
    fn tenancy(&self) -> Result<String, BoxError> {
        required("tenancy", &self.tenancy)
    }

    fn user(&self) -> Result<String, BoxError> {
        required("user", &self.user)
    }

    fn key_fingerprint(&self) -> Result<String, BoxError> {
        required("key fingerprint", &self.fingerprint)
    }

    fn private_key(&self) -> Result<String, BoxError> {
        required("private key", &self.private_key)
    }

    fn region(&self) -> Result<String, BoxError> {
        required("region", &self.region)
    }
}

/// Builds the client for one operation
pub trait ClientFactory<C> {
    fn create(
        &self,
        provider: &dyn ConfigurationProvider,
        config: &TestingConfig,
    ) -> Result<C, BoxError>;
}

impl<C, F> ClientFactory<C> for F
where
    F: Fn(&dyn ConfigurationProvider, &TestingConfig) -> Result<C, BoxError>,
{
    fn create(
        &self,
        provider: &dyn ConfigurationProvider,
        config: &TestingConfig,
    ) -> Result<C, BoxError> {
        self(provider, config)
    }
}
