//! Registry of previews that may be fetched by name.
//!
//! Only files registered here can be served back to clients. A name is the
//! artifact's file name; lookups never touch the filesystem, so a client
//! cannot reach anything the pipeline did not produce.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::metrics::ARTIFACTS_REGISTERED;

/// Errors that can occur when registering an artifact.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The artifact does not live directly under the registry root.
    #[error("Artifact {path} is outside {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// The artifact has no usable file name.
    #[error("Artifact {path} has no valid file name")]
    InvalidName { path: PathBuf },
}

/// Opaque name to path mapping for resident previews.
#[derive(Debug)]
pub struct ArtifactRegistry {
    root: PathBuf,
    entries: RwLock<HashMap<String, PathBuf>>,
}

impl ArtifactRegistry {
    /// Creates an empty registry accepting files directly under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `path` and returns the name it can be fetched by.
    pub async fn register(&self, path: &Path) -> Result<String, RegistryError> {
        if path.parent() != Some(self.root.as_path()) {
            return Err(RegistryError::OutsideRoot {
                path: path.to_path_buf(),
                root: self.root.clone(),
            });
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| is_valid_name(n))
            .ok_or_else(|| RegistryError::InvalidName {
                path: path.to_path_buf(),
            })?
            .to_string();

        let mut entries = self.entries.write().await;
        entries.insert(name.clone(), path.to_path_buf());
        ARTIFACTS_REGISTERED.set(entries.len() as i64);

        Ok(name)
    }

    /// Looks up a registered artifact. Unknown or malformed names yield `None`.
    pub async fn resolve(&self, name: &str) -> Option<PathBuf> {
        if !is_valid_name(name) {
            return None;
        }
        self.entries.read().await.get(name).cloned()
    }

    /// Forgets an artifact without touching the file.
    pub async fn remove(&self, name: &str) -> Option<PathBuf> {
        let mut entries = self.entries.write().await;
        let removed = entries.remove(name);
        ARTIFACTS_REGISTERED.set(entries.len() as i64);
        removed
    }

    /// Number of registered artifacts.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// A bare file name: no separators, no parent references.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_resolve() {
        let registry = ArtifactRegistry::new("/scratch");
        let name = registry
            .register(Path::new("/scratch/upload-abc.webm"))
            .await
            .unwrap();

        assert_eq!(name, "upload-abc.webm");
        assert_eq!(
            registry.resolve("upload-abc.webm").await,
            Some(PathBuf::from("/scratch/upload-abc.webm"))
        );
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_name_is_not_resolved() {
        let registry = ArtifactRegistry::new("/scratch");
        assert!(registry.resolve("nonexistent.webm").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_traversal_names_are_rejected() {
        let registry = ArtifactRegistry::new("/scratch");
        registry
            .register(Path::new("/scratch/upload-abc.webm"))
            .await
            .unwrap();

        for name in ["../upload-abc.webm", "..", "a/b", "a\\b", ""] {
            assert!(registry.resolve(name).await.is_none(), "{name} resolved");
        }
    }

    #[tokio::test]
    async fn test_register_outside_root_fails() {
        let registry = ArtifactRegistry::new("/scratch");
        let err = registry
            .register(Path::new("/etc/passwd"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::OutsideRoot { .. }));

        let err = registry
            .register(Path::new("/scratch/nested/upload.webm"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::OutsideRoot { .. }));
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = ArtifactRegistry::new("/scratch");
        let name = registry
            .register(Path::new("/scratch/upload-abc.webm"))
            .await
            .unwrap();

        assert!(registry.remove(&name).await.is_some());
        assert!(registry.resolve(&name).await.is_none());
        assert!(registry.remove(&name).await.is_none());
    }
}
