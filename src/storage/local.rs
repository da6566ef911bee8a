use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::{public_url, StorageClient};

/// Public disk on the local filesystem, served by the router under `/storage`.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
    public_url: String,
}

impl LocalDisk {
    pub async fn new(root: impl Into<PathBuf>, public_url: &str) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create storage root {}", root.display()))?;
        Ok(Self {
            root,
            public_url: public_url.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a key onto the disk, refusing anything that could leave the root.
    fn resolve(&self, key: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(key);
        if key.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            anyhow::bail!("invalid storage key {key:?}");
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl StorageClient for LocalDisk {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        debug!(key, size = body.len(), "writing file");
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.resolve(key)?;
        debug!(key, "deleting file");
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let path = self.resolve(key)?;
        tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("stat {}", path.display()))
    }

    fn url(&self, key: &str) -> String {
        public_url(&self.public_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn disk() -> LocalDisk {
        let root = std::env::temp_dir().join(format!("wanderlist-disk-{}", uuid::Uuid::new_v4()));
        LocalDisk::new(root, "http://localhost:8080/storage").await.unwrap()
    }

    #[tokio::test]
    async fn write_check_delete() {
        let disk = disk().await;
        let key = "destinations/a.png";

        disk.put_object(key, Bytes::from_static(b"png"), "image/png").await.unwrap();
        assert!(disk.exists(key).await.unwrap());
        assert_eq!(std::fs::read(disk.root().join(key)).unwrap(), b"png");

        disk.delete_object(key).await.unwrap();
        assert!(!disk.exists(key).await.unwrap());
        // second delete is a no-op
        disk.delete_object(key).await.unwrap();

        let _ = std::fs::remove_dir_all(disk.root());
    }

    #[tokio::test]
    async fn rejects_keys_outside_root() {
        let disk = disk().await;
        assert!(disk.put_object("../escape.png", Bytes::new(), "image/png").await.is_err());
        assert!(disk.exists("/etc/passwd").await.is_err());
        assert!(disk.delete_object("").await.is_err());
        let _ = std::fs::remove_dir_all(disk.root());
    }

    #[tokio::test]
    async fn url_points_at_public_prefix() {
        let disk = disk().await;
        assert_eq!(
            disk.url("destinations/a.png"),
            "http://localhost:8080/storage/destinations/a.png"
        );
        let _ = std::fs::remove_dir_all(disk.root());
    }
}
