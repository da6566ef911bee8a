use std::collections::HashMap;
use std::sync::Arc;

use axum::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{public_url, StorageClient};

/// Keeps objects in a map; used by `AppState::fake` and `STORAGE_DRIVER=memory`.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<String, (Bytes, String)>>>,
    public_url: String,
}

impl MemoryStorage {
    pub fn new(public_url: &str) -> Self {
        Self {
            objects: Arc::default(),
            public_url: public_url.to_string(),
        }
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn get(&self, key: &str) -> Option<(Bytes, String)> {
        self.objects.read().await.get(key).cloned()
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.objects
            .write()
            .await
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    fn url(&self, key: &str) -> String {
        public_url(&self.public_url, key)
    }
}
