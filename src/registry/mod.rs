//! Operation registries and reference data stores

mod file;
mod memory;

pub use file::{DirectoryReferenceStore, ManifestRegistry, RegistryManifest, WILDCARD};
pub use memory::{InMemoryReferenceStore, InMemoryRegistry};
