//! File-backed collaborators
//!
//! A manifest lists enabled operations; recorded batches live in
//! `<root>/<service>/<operation>.json`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BoxError, StoreError};
use crate::models::OperationKey;
use crate::sdk::{OperationRegistry, ReferenceDataStore};

/// Matches every operation of a service
pub const WILDCARD: &str = "*";

/// Enabled and disabled operations per service
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryManifest {
    #[serde(default)]
    pub enabled: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub disabled: BTreeMap<String, Vec<String>>,
}

impl RegistryManifest {
    fn listed(entries: &BTreeMap<String, Vec<String>>, key: &OperationKey) -> bool {
        entries
            .get(&key.service)
            .is_some_and(|ops| ops.iter().any(|op| op == WILDCARD || *op == key.operation))
    }

    /// Disabled entries win over enabled ones
    pub fn is_enabled(&self, key: &OperationKey) -> bool {
        Self::listed(&self.enabled, key) && !Self::listed(&self.disabled, key)
    }
}

/// Registry backed by a YAML or JSON manifest
#[derive(Clone, Debug)]
pub struct ManifestRegistry {
    manifest: RegistryManifest,
}

impl ManifestRegistry {
    pub fn new(manifest: RegistryManifest) -> Self {
        Self { manifest }
    }

    /// Load the manifest; `.yaml`/`.yml` is YAML, anything else JSON
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

        let manifest = if is_yaml(path) {
            serde_yaml::from_str(&content).context("Failed to parse YAML manifest")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON manifest")?
        };
        Ok(Self::new(manifest))
    }

    pub fn manifest(&self) -> &RegistryManifest {
        &self.manifest
    }
}

#[async_trait]
impl OperationRegistry for ManifestRegistry {
    async fn is_enabled(&self, key: &OperationKey) -> Result<bool, BoxError> {
        Ok(self.manifest.is_enabled(key))
    }
}

/// Reference store reading `<root>/<service>/<operation>.json`
#[derive(Clone, Debug)]
pub struct DirectoryReferenceStore {
    root: PathBuf,
}

impl DirectoryReferenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &OperationKey) -> PathBuf {
        self.root
            .join(&key.service)
            .join(format!("{}.json", key.operation))
    }
}

#[async_trait]
impl ReferenceDataStore for DirectoryReferenceStore {
    async fn get_requests(&self, key: &OperationKey) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key);
        debug!("Reading recorded requests from {}", path.display());
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::Missing(key.clone())),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_rules() {
        let yaml = r#"
enabled:
  widgets: ["CreateWidget", "ListWidgets"]
  gadgets: ["*"]
disabled:
  gadgets: ["DeleteGadget"]
"#;
        let manifest: RegistryManifest = serde_yaml::from_str(yaml).unwrap();

        assert!(manifest.is_enabled(&OperationKey::new("widgets", "ListWidgets")));
        assert!(!manifest.is_enabled(&OperationKey::new("widgets", "DeleteWidget")));
        assert!(manifest.is_enabled(&OperationKey::new("gadgets", "GetGadget")));
        assert!(!manifest.is_enabled(&OperationKey::new("gadgets", "DeleteGadget")));
        assert!(!manifest.is_enabled(&OperationKey::new("sprockets", "ListSprockets")));
    }

    #[test]
    fn test_load_json_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, r#"{"enabled": {"widgets": ["GetWidget"]}}"#).unwrap();

        let registry = ManifestRegistry::load(&path).unwrap();
        let key = OperationKey::new("widgets", "GetWidget");
        assert!(tokio_test::block_on(registry.is_enabled(&key)).unwrap());
        assert!(registry.manifest().disabled.is_empty());
    }

    #[test]
    fn test_load_missing_manifest() {
        let dir = TempDir::new().unwrap();
        assert!(ManifestRegistry::load(dir.path().join("nope.yaml")).is_err());
    }

    #[tokio::test]
    async fn test_directory_store() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("widgets")).unwrap();
        std::fs::write(dir.path().join("widgets/ListWidgets.json"), "[]").unwrap();

        let store = DirectoryReferenceStore::new(dir.path());
        let key = OperationKey::new("widgets", "ListWidgets");
        assert_eq!(store.get_requests(&key).await.unwrap(), b"[]");

        let missing = OperationKey::new("widgets", "GetWidget");
        assert!(matches!(
            store.get_requests(&missing).await,
            Err(StoreError::Missing(_))
        ));
    }
}
