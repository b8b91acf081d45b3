//! Environment variable configuration
//!
//! Overrides the host may apply on top of file configuration. Nothing in
//! the harness reads these on its own; the host calls [`EnvConfig::load`].

use std::env;
use std::path::PathBuf;

use anyhow::Result;

use super::{ConfigFile, HarnessConfig};
use crate::loader::UnknownFieldPolicy;

/// Environment variable prefix
const ENV_PREFIX: &str = "SDK_CONFORMANCE";

/// Configuration read from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Endpoint from SDK_CONFORMANCE_ENDPOINT
    pub endpoint: Option<String>,
    /// Region from SDK_CONFORMANCE_REGION
    pub region: Option<String>,
    /// Retries from SDK_CONFORMANCE_RETRIES
    pub retries: Option<bool>,
    /// Log level from SDK_CONFORMANCE_LOG_LEVEL
    pub log_level: Option<String>,
    /// Unknown field policy from SDK_CONFORMANCE_UNKNOWN_FIELDS
    pub unknown_fields: Option<UnknownFieldPolicy>,
    /// Page ceiling from SDK_CONFORMANCE_MAX_PAGES
    pub max_pages: Option<usize>,
    /// Concurrency from SDK_CONFORMANCE_MAX_CONCURRENT
    pub max_concurrent: Option<usize>,
    /// Testing service from SDK_CONFORMANCE_SERVICE_URL
    pub service_url: Option<String>,
    /// Reference directory from SDK_CONFORMANCE_REFERENCE_DIR
    pub reference_dir: Option<PathBuf>,
    /// Config file from SDK_CONFORMANCE_CONFIG
    pub config_file: Option<PathBuf>,
    /// Environment name from SDK_CONFORMANCE_ENV
    pub environment: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            endpoint: get_env("ENDPOINT"),
            region: get_env("REGION"),
            retries: get_env_bool("RETRIES"),
            log_level: get_env("LOG_LEVEL"),
            unknown_fields: get_env("UNKNOWN_FIELDS")
                .and_then(|v| UnknownFieldPolicy::from_str(&v)),
            max_pages: get_env_parse("MAX_PAGES"),
            max_concurrent: get_env_parse("MAX_CONCURRENT"),
            service_url: get_env("SERVICE_URL"),
            reference_dir: get_env("REFERENCE_DIR").map(PathBuf::from),
            config_file: get_env("CONFIG").map(PathBuf::from),
            environment: get_env("ENV"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.endpoint.is_some()
            || self.region.is_some()
            || self.retries.is_some()
            || self.log_level.is_some()
            || self.unknown_fields.is_some()
            || self.max_pages.is_some()
            || self.max_concurrent.is_some()
            || self.service_url.is_some()
            || self.reference_dir.is_some()
            || self.config_file.is_some()
            || self.environment.is_some()
    }

    /// Overlay the set variables onto `config`
    pub fn apply(&self, config: &mut HarnessConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.testing.endpoint = Some(endpoint.clone());
        }
        if let Some(region) = &self.region {
            config.testing.region = Some(region.clone());
        }
        if let Some(retries) = self.retries {
            config.retries_enabled = retries;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(policy) = self.unknown_fields {
            config.unknown_fields = policy;
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.max_concurrent = max_concurrent;
        }
        if let Some(url) = &self.service_url {
            config.testing_service.url = Some(url.clone());
        }
        if let Some(dir) = &self.reference_dir {
            config.reference_dir = Some(dir.clone());
        }
    }

    /// Harness configuration from the selected file and environment
    ///
    /// Reads `config_file`, or the first standard location when unset,
    /// resolves `environment` in it, then overlays the other variables.
    pub fn resolve(&self) -> Result<HarnessConfig> {
        let file = match &self.config_file {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::load_default()?,
        };
        let mut config = file.resolve(self.environment.as_deref())?;
        self.apply(&mut config);
        Ok(config)
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Builder for setting environment variables (useful for testing)
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_ENDPOINT"), endpoint.into()));
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_REGION"), region.into()));
        self
    }

    pub fn retries(mut self, enabled: bool) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_RETRIES"), enabled.to_string()));
        self
    }

    pub fn unknown_fields(mut self, policy: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_UNKNOWN_FIELDS"), policy.into()));
        self
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_MAX_PAGES"), max_pages.to_string()));
        self
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}
