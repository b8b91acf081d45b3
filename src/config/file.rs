//! Configuration file management
//!
//! Handles finding, loading, and validating configuration files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{HarnessConfig, TestingConfig, TestingServiceConfig};

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./sdk-conformance.yaml",
    "./sdk-conformance.yml",
    "./.sdk-conformance.yaml",
    "./.sdk-conformance/config.yaml",
    "~/.config/sdk-conformance/config.yaml",
    "~/.sdk-conformance.yaml",
];

/// Full configuration file structure
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// Harness settings
    #[serde(default)]
    pub harness: HarnessConfig,

    /// Named targets (e.g. a local mock server, a staging region)
    #[serde(default)]
    pub environments: Vec<EnvironmentConfig>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            harness: HarnessConfig::default(),
            environments: Vec::new(),
        }
    }
}

impl ConfigFile {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        match Self::find() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }

        for (i, env) in self.environments.iter().enumerate() {
            if env.name.trim().is_empty() {
                anyhow::bail!("Environment #{i} has no name");
            }
            if self.environments[..i].iter().any(|e| e.name == env.name) {
                anyhow::bail!("Duplicate environment '{}'", env.name);
            }
            if env.testing.target().is_err() {
                anyhow::bail!(
                    "Environment '{}' needs a valid endpoint or a region",
                    env.name
                );
            }
        }

        Ok(())
    }

    /// Generate example configuration
    pub fn example() -> Self {
        Self {
            version: default_version(),
            harness: HarnessConfig {
                testing: TestingConfig::with_region("us-phoenix-1"),
                ..Default::default()
            },
            environments: vec![
                EnvironmentConfig::new("mock", TestingConfig::with_endpoint("http://localhost:8090")),
                EnvironmentConfig::new("staging", TestingConfig::with_region("us-ashburn-1"))
                    .with_retries(true),
            ],
        }
    }

    /// Get environment by name
    pub fn environment(&self, name: &str) -> Option<&EnvironmentConfig> {
        self.environments.iter().find(|e| e.name == name)
    }

    /// Harness configuration with the named environment applied
    pub fn resolve(&self, environment: Option<&str>) -> Result<HarnessConfig> {
        let mut harness = self.harness.clone();
        if let Some(name) = environment {
            let env = self
                .environment(name)
                .with_context(|| format!("Unknown environment: {name}"))?;
            harness.testing = env.testing.clone().or(&harness.testing);
            if let Some(retries) = env.retries_enabled {
                harness.retries_enabled = retries;
            }
        }
        Ok(harness)
    }

    /// Merge with another config (other takes precedence)
    ///
    /// Every scalar setting comes from `other`. Unset targets, paths and
    /// the testing service URL fall back to `self`.
    pub fn merge(&mut self, other: ConfigFile) {
        let theirs = other.harness;
        let ours = std::mem::take(&mut self.harness);
        self.harness = HarnessConfig {
            testing: theirs.testing.clone().or(&ours.testing),
            testing_service: TestingServiceConfig {
                url: theirs.testing_service.url.clone().or(ours.testing_service.url),
                ..theirs.testing_service.clone()
            },
            reference_dir: theirs.reference_dir.clone().or(ours.reference_dir),
            registry_manifest: theirs.registry_manifest.clone().or(ours.registry_manifest),
            ..theirs
        };

        for env in other.environments {
            match self.environments.iter_mut().find(|e| e.name == env.name) {
                Some(existing) => *existing = env,
                None => self.environments.push(env),
            }
        }
    }
}

/// Named testing target
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Environment name (e.g., "mock", "staging")
    pub name: String,
    /// Endpoint or region for this environment
    #[serde(flatten)]
    pub testing: TestingConfig,
    /// Retry override for this environment
    #[serde(default)]
    pub retries_enabled: Option<bool>,
}

impl EnvironmentConfig {
    pub fn new(name: impl Into<String>, testing: TestingConfig) -> Self {
        Self {
            name: name.into(),
            testing,
            retries_enabled: None,
        }
    }

    pub fn with_retries(mut self, enabled: bool) -> Self {
        self.retries_enabled = Some(enabled);
        self
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::UnknownFieldPolicy;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_default() {
        let config = ConfigFile::default();
        assert_eq!(config.version, "1.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = ConfigFile::example();
        config.save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.version, config.version);
        assert_eq!(loaded.environments.len(), 2);
        assert_eq!(
            loaded.environment("mock").unwrap().testing.endpoint(),
            Some("http://localhost:8090")
        );
    }

    #[test]
    fn test_resolve_environment() {
        let config = ConfigFile::example();

        let mock = config.resolve(Some("mock")).unwrap();
        assert_eq!(mock.testing.endpoint(), Some("http://localhost:8090"));
        assert_eq!(mock.testing.region(), Some("us-phoenix-1"));
        assert!(!mock.retries_enabled);

        let staging = config.resolve(Some("staging")).unwrap();
        assert_eq!(staging.testing.region(), Some("us-ashburn-1"));
        assert!(staging.retries_enabled);

        assert!(config.resolve(Some("prod")).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_environment() {
        let mut config = ConfigFile::example();
        config
            .environments
            .push(EnvironmentConfig::new("mock", TestingConfig::with_region("x")));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_untargeted_environment() {
        let mut config = ConfigFile::default();
        config
            .environments
            .push(EnvironmentConfig::new("empty", TestingConfig::default()));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_replaces_environment() {
        let mut base = ConfigFile::example();
        let mut other = ConfigFile::default();
        other.environments.push(EnvironmentConfig::new(
            "mock",
            TestingConfig::with_endpoint("http://127.0.0.1:1234"),
        ));
        base.merge(other);

        assert_eq!(base.environments.len(), 2);
        assert_eq!(
            base.environment("mock").unwrap().testing.endpoint(),
            Some("http://127.0.0.1:1234")
        );
    }

    #[test]
    fn test_merge_other_takes_precedence() {
        let mut base = ConfigFile::example();
        base.harness.retries_enabled = true;
        base.harness.max_pages = 10;
        base.harness.reference_dir = Some(PathBuf::from("/data/recorded"));
        base.harness.testing_service.url = Some("http://localhost:8090".to_string());

        let mut other = ConfigFile::default();
        other.harness.testing = TestingConfig::with_endpoint("http://127.0.0.1:1234");
        other.harness.retries_enabled = false;
        other.harness.log_level = "debug".to_string();
        other.harness.unknown_fields = UnknownFieldPolicy::Deny;
        other.harness.max_pages = 5;
        other.harness.max_concurrent = 1;
        other.harness.testing_service.lang = "Go".to_string();
        other.harness.testing_service.timeout_secs = 5;
        other.harness.registry_manifest = Some(PathBuf::from("registry.yaml"));
        base.merge(other);

        let merged = &base.harness;
        assert!(!merged.retries_enabled);
        assert_eq!(merged.log_level, "debug");
        assert_eq!(merged.unknown_fields, UnknownFieldPolicy::Deny);
        assert_eq!(merged.max_pages, 5);
        assert_eq!(merged.max_concurrent, 1);
        assert_eq!(merged.testing_service.lang, "Go");
        assert_eq!(merged.testing_service.timeout_secs, 5);
        assert_eq!(
            merged.testing_service.url.as_deref(),
            Some("http://localhost:8090")
        );
        assert_eq!(merged.testing.endpoint(), Some("http://127.0.0.1:1234"));
        assert_eq!(merged.testing.region(), Some("us-phoenix-1"));
        assert_eq!(merged.reference_dir, Some(PathBuf::from("/data/recorded")));
        assert_eq!(merged.registry_manifest, Some(PathBuf::from("registry.yaml")));
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
    }
}
