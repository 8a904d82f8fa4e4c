use std::path::{Path, PathBuf};

use crate::error::BackendError;
use crate::traits::FileStorage;

/// Stores uploads as files under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Keeps only the final path component so a name cannot escape the root.
fn sanitize(name: &str) -> Option<&str> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
}

impl FileStorage for DirectoryStorage {
    async fn upload(&self, local_path: &Path, name: &str) -> Result<String, BackendError> {
        let file_name = sanitize(name).ok_or_else(|| BackendError::ValidationFailed {
            field: "file".into(),
            reason: format!("invalid file name '{name}'"),
        })?;
        let target = self.root.join(file_name);
        let location = target.display().to_string();
        let storage_err = |e: std::io::Error| BackendError::StorageError {
            location: location.clone(),
            message: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(storage_err)?;
        // Source and root may be on different filesystems.
        tokio::fs::copy(local_path, &target)
            .await
            .map_err(storage_err)?;
        tracing::info!(location = %location, "file stored");
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize("../../etc/passwd"), Some("passwd"));
        assert_eq!(sanitize("photo.png"), Some("photo.png"));
        assert_eq!(sanitize(""), None);
        assert_eq!(sanitize(".."), None);
    }

    #[tokio::test]
    async fn upload_copies_into_root() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.txt");
        tokio::fs::write(&source, b"hello").await.unwrap();

        let storage = DirectoryStorage::new(dir.path().join("uploads"));
        let location = storage.upload(&source, "nested/greeting.txt").await.unwrap();

        assert!(location.ends_with("greeting.txt"));
        let stored = tokio::fs::read(&location).await.unwrap();
        assert_eq!(stored, b"hello");
    }

    #[tokio::test]
    async fn upload_missing_source_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path());
        let err = storage
            .upload(&dir.path().join("absent"), "x.bin")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::StorageError { .. }));
    }
}
