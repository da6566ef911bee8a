use anyhow::Context;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::storage::StorageClient;
use crate::validation::UploadedFile;

pub const IMAGE_PREFIX: &str = "destinations";

/// Writes an uploaded image under `destinations/` and returns its key.
pub async fn store_image(storage: &dyn StorageClient, file: UploadedFile) -> anyhow::Result<String> {
    let kind = file.kind().context("uploaded file is not a recognised image")?;
    let key = format!("{IMAGE_PREFIX}/{}.{}", Uuid::new_v4(), kind.extension());
    storage
        .put_object(&key, file.body, kind.mime())
        .await
        .with_context(|| format!("put_object {key}"))?;
    debug!(%key, "image stored");
    Ok(key)
}

/// Removes a previously stored image. A missing file only logs; a failed
/// existence check falls through to the delete.
pub async fn discard_image(storage: &dyn StorageClient, key: &str) -> anyhow::Result<()> {
    match storage.exists(key).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(%key, "image already gone");
            return Ok(());
        }
        Err(e) => warn!(error = %e, %key, "image existence check failed; deleting anyway"),
    }
    storage
        .delete_object(key)
        .await
        .with_context(|| format!("delete_object {key}"))?;
    debug!(%key, "image deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use axum::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Storage whose lookups always fail; counts delete calls.
    #[derive(Default)]
    struct FlakyLookups {
        deletes: AtomicUsize,
    }

    #[async_trait]
    impl StorageClient for FlakyLookups {
        async fn put_object(&self, _: &str, _: Bytes, _: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn delete_object(&self, _: &str) -> anyhow::Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn exists(&self, _: &str) -> anyhow::Result<bool> {
            anyhow::bail!("connection reset")
        }

        fn url(&self, key: &str) -> String {
            key.to_string()
        }
    }

    fn png() -> UploadedFile {
        UploadedFile {
            file_name: Some("pic.png".into()),
            content_type: Some("image/png".into()),
            body: Bytes::from_static(b"\x89PNG\r\n\x1a\n0000"),
        }
    }

    #[tokio::test]
    async fn stores_under_prefix_with_sniffed_extension() {
        let storage = MemoryStorage::new("http://localhost/storage");
        let key = store_image(&storage, png()).await.unwrap();

        assert!(key.starts_with("destinations/"));
        assert!(key.ends_with(".png"));
        let (_, content_type) = storage.get(&key).await.unwrap();
        assert_eq!(content_type, "image/png");
    }

    #[tokio::test]
    async fn rejects_non_images() {
        let storage = MemoryStorage::new("http://localhost/storage");
        let text = UploadedFile {
            file_name: None,
            content_type: None,
            body: Bytes::from_static(b"hello"),
        };
        assert!(store_image(&storage, text).await.is_err());
        assert!(storage.keys().await.is_empty());
    }

    #[tokio::test]
    async fn discard_removes_and_tolerates_missing() {
        let storage = MemoryStorage::new("http://localhost/storage");
        let key = store_image(&storage, png()).await.unwrap();

        discard_image(&storage, &key).await.unwrap();
        assert!(!storage.exists(&key).await.unwrap());
        discard_image(&storage, &key).await.unwrap();
    }

    #[tokio::test]
    async fn discard_deletes_when_lookup_fails() {
        let storage = FlakyLookups::default();
        discard_image(&storage, "destinations/x.png").await.unwrap();
        assert_eq!(storage.deletes.load(Ordering::SeqCst), 1);
    }
}
