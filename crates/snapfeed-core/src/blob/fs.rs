//! Filesystem blob store for local runs and tests.
//!
//! Keys map directly to paths under a root directory, so a local run
//! produces the same `visual_captures/...` tree an S3 run would.

use std::path::{Path, PathBuf};

use crate::error::BlobError;

use super::{to_stored_json, BlobStore};

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The local path a key resolves to.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    async fn prepare_parent(&self, key: &str) -> Result<PathBuf, BlobError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| BlobError::Io {
                    key: key.to_string(),
                    source,
                })?;
        }
        Ok(path)
    }
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    async fn put_image(&self, local_path: &Path, key: &str) -> Result<(), BlobError> {
        let dest = self.prepare_parent(key).await?;
        tokio::fs::copy(local_path, &dest)
            .await
            .map_err(|source| BlobError::Io {
                key: key.to_string(),
                source,
            })?;
        tracing::debug!(key, "stored image");
        Ok(())
    }

    async fn put_json(&self, value: &serde_json::Value, key: &str) -> Result<(), BlobError> {
        let dest = self.prepare_parent(key).await?;
        let body = to_stored_json(value, key)?;
        tokio::fs::write(&dest, body)
            .await
            .map_err(|source| BlobError::Io {
                key: key.to_string(),
                source,
            })?;
        tracing::debug!(key, "stored JSON");
        Ok(())
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound {
                key: key.to_string(),
            }),
            Err(source) => Err(BlobError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        let value = serde_json::json!({"tweet_id": "123", "screenshot_count": 2});
        store
            .put_json(&value, "visual_captures/2026-08-01/x/tweet_123/capture_metadata.json")
            .await
            .unwrap();

        let loaded = store
            .get_json("visual_captures/2026-08-01/x/tweet_123/capture_metadata.json")
            .await
            .unwrap();
        assert_eq!(loaded["tweet_id"], "123");
        assert_eq!(loaded["screenshot_count"], 2);
    }

    #[tokio::test]
    async fn put_json_overwrites_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store
            .put_json(&serde_json::json!({"v": 1}), "a/b.json")
            .await
            .unwrap();
        store
            .put_json(&serde_json::json!({"v": 2}), "a/b.json")
            .await
            .unwrap();

        let loaded = store.get_json("a/b.json").await.unwrap();
        assert_eq!(loaded["v"], 2);
    }

    #[tokio::test]
    async fn put_image_copies_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("blobs"));

        let src = dir.path().join("shot.png");
        tokio::fs::write(&src, b"png-bytes").await.unwrap();

        store.put_image(&src, "captures/shot.png").await.unwrap();
        let bytes = store.get_bytes("captures/shot.png").await.unwrap();
        assert_eq!(bytes, b"png-bytes");
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        let err = store.get_bytes("missing/key.json").await.unwrap_err();
        assert!(matches!(err, BlobError::NotFound { .. }));
    }
}
