//! Configuration module
//!
//! Handles loading and managing harness configuration.

mod env;
mod file;
mod testing;

pub use env::{EnvBuilder, EnvConfig, EnvGuard};
pub use file::{ConfigFile, EnvironmentConfig};
pub use testing::{ClientTarget, ConfigError, TestingConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::loader::UnknownFieldPolicy;
use crate::pagination::DEFAULT_MAX_PAGES;

/// Harness configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Endpoint or region of the system under test
    pub testing: TestingConfig,

    /// Install a retry policy on every request
    pub retries_enabled: bool,

    /// Logging verbosity (trace, debug, info, warn, error)
    pub log_level: String,

    /// What to do with unknown fields in recorded batches
    pub unknown_fields: UnknownFieldPolicy,

    /// Page ceiling for paginated operations
    pub max_pages: usize,

    /// Maximum operations running at once
    pub max_concurrent: usize,

    /// Remote testing service
    pub testing_service: TestingServiceConfig,

    /// Directory holding `<service>/<operation>.json` batches
    pub reference_dir: Option<PathBuf>,

    /// Manifest listing enabled operations
    pub registry_manifest: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            testing: TestingConfig::default(),
            retries_enabled: false,
            log_level: "info".to_string(),
            unknown_fields: UnknownFieldPolicy::default(),
            max_pages: DEFAULT_MAX_PAGES,
            max_concurrent: 4,
            testing_service: TestingServiceConfig::default(),
            reference_dir: None,
            registry_manifest: None,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Self = if is_yaml(path.as_ref()) {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = if is_yaml(path.as_ref()) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.testing
            .target()
            .context("Testing configuration needs an endpoint or a region")?;

        if self.max_pages == 0 {
            anyhow::bail!("max_pages must be at least 1");
        }
        if self.max_concurrent == 0 {
            anyhow::bail!("max_concurrent must be at least 1");
        }
        if crate::utils::LogLevel::from_str(&self.log_level).is_none() {
            anyhow::bail!("Unknown log level: {}", self.log_level);
        }
        Ok(())
    }
}

/// Remote SDK testing service settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TestingServiceConfig {
    /// Base URL, e.g. `http://localhost:8090`
    pub url: Option<String>,

    /// SDK language reported to the service
    pub lang: String,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TestingServiceConfig {
    fn default() -> Self {
        Self {
            url: None,
            lang: "Rust".to_string(),
            timeout_secs: 30,
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
