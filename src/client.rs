//! Client-side login state.
//!
//! [`AuthStore`] keeps a single "logged in" flag that mirrors whether a token
//! sits in a persisted slot. The token itself is never inspected.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

/// A persisted slot holding at most one token.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<String>>;
    async fn save(&self, token: &str) -> anyhow::Result<()>;
    /// Clearing an empty slot is not an error.
    async fn clear(&self) -> anyhow::Result<()>;
}

/// Token kept in a single file.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn load(&self) -> anyhow::Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(token) => Ok(Some(token.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read token file {}", self.path.display())),
        }
    }

    async fn save(&self, token: &str) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create {}", dir.display()))?;
        }
        tokio::fs::write(&self.path, token)
            .await
            .with_context(|| format!("write token file {}", self.path.display()))
    }

    async fn clear(&self) -> anyhow::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove token file {}", self.path.display())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStorage {
    slot: Arc<RwLock<Option<String>>>,
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn load(&self) -> anyhow::Result<Option<String>> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, token: &str) -> anyhow::Result<()> {
        *self.slot.write().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}

pub struct AuthStore {
    storage: Option<Arc<dyn TokenStorage>>,
    logged_in: watch::Sender<bool>,
}

impl AuthStore {
    /// Starts logged in when the slot holds a non-empty token. Without a slot,
    /// or when it cannot be read, the store starts logged out.
    pub async fn new(storage: Option<Arc<dyn TokenStorage>>) -> Self {
        let initial = match &storage {
            Some(slot) => match slot.load().await {
                Ok(token) => token.is_some_and(|t| !t.is_empty()),
                Err(e) => {
                    warn!(error = %e, "token slot unreadable; starting logged out");
                    false
                }
            },
            None => false,
        };
        let (logged_in, _) = watch::channel(initial);
        Self { storage, logged_in }
    }

    pub async fn login(&self, token: &str) -> anyhow::Result<()> {
        if let Some(slot) = &self.storage {
            slot.save(token).await?;
        }
        self.set(true);
        Ok(())
    }

    pub async fn logout(&self) -> anyhow::Result<()> {
        if let Some(slot) = &self.storage {
            slot.clear().await?;
        }
        self.set(false);
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        *self.logged_in.borrow()
    }

    /// Receivers are woken only when the flag actually changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.logged_in.subscribe()
    }

    pub async fn token(&self) -> anyhow::Result<Option<String>> {
        match &self.storage {
            Some(slot) => slot.load().await,
            None => Ok(None),
        }
    }

    fn set(&self, value: bool) {
        let changed = self.logged_in.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
        if changed {
            debug!(logged_in = value, "auth state changed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Arc<dyn TokenStorage> {
        Arc::new(MemoryTokenStorage::default())
    }

    #[tokio::test]
    async fn starts_from_persisted_token() {
        let slot = memory();
        slot.save("abc").await.unwrap();
        assert!(AuthStore::new(Some(slot)).await.is_logged_in());

        let empty = memory();
        empty.save("").await.unwrap();
        assert!(!AuthStore::new(Some(empty)).await.is_logged_in());

        assert!(!AuthStore::new(None).await.is_logged_in());
    }

    #[tokio::test]
    async fn login_and_logout_persist_and_notify() {
        let slot = memory();
        let store = AuthStore::new(Some(slot.clone())).await;
        let mut rx = store.subscribe();

        store.login("tok").await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
        assert_eq!(slot.load().await.unwrap().as_deref(), Some("tok"));

        store.logout().await.unwrap();
        assert!(!*rx.borrow_and_update());
        assert_eq!(store.token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn repeated_login_does_not_renotify() {
        let store = AuthStore::new(Some(memory())).await;
        store.login("a").await.unwrap();
        let mut rx = store.subscribe();
        store.login("b").await.unwrap();
        assert!(!rx.has_changed().unwrap());
        assert_eq!(store.token().await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn without_storage_only_the_flag_moves() {
        let store = AuthStore::new(None).await;
        store.login("a").await.unwrap();
        assert!(store.is_logged_in());
        assert_eq!(store.token().await.unwrap(), None);
        store.logout().await.unwrap();
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn file_slot_survives_a_new_store() {
        let path = std::env::temp_dir()
            .join(format!("wanderlist-token-{}", uuid::Uuid::new_v4()))
            .join("token");
        let slot: Arc<dyn TokenStorage> = Arc::new(FileTokenStorage::new(&path));

        AuthStore::new(Some(slot.clone())).await.login("persisted").await.unwrap();
        let reopened = AuthStore::new(Some(slot.clone())).await;
        assert!(reopened.is_logged_in());
        assert_eq!(reopened.token().await.unwrap().as_deref(), Some("persisted"));

        reopened.logout().await.unwrap();
        assert!(!AuthStore::new(Some(slot)).await.is_logged_in());
        assert!(!path.exists());
    }
}
