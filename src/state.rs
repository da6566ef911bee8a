use crate::auth::TokenGuard;
use crate::config::{AppConfig, StorageDriver};
use crate::db::{MemoryStore, PgStore, Store};
use crate::storage::{LocalDisk, MemoryStorage, Storage, StorageClient};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub tokens: TokenGuard,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db: Arc<dyn Store> = match config.database_url.as_deref() {
            Some(url) => {
                let pg = PgStore::connect(url).await?;
                pg.migrate().await?;
                info!("using postgres store");
                Arc::new(pg)
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
                Arc::new(MemoryStore::new())
            }
        };

        let public_url = config.storage.public_url.as_str();
        let storage: Arc<dyn StorageClient> = match config.storage.driver {
            StorageDriver::Local => Arc::new(LocalDisk::new(config.storage.root.clone(), public_url).await?),
            StorageDriver::S3 => {
                let s3 = config
                    .storage
                    .s3
                    .as_ref()
                    .context("s3 storage selected without S3 settings")?;
                Arc::new(Storage::new(s3, public_url).await?)
            }
            StorageDriver::Memory => Arc::new(MemoryStorage::new(public_url)),
        };
        info!(driver = ?config.storage.driver, "storage ready");

        Ok(Self::from_parts(db, Arc::new(config), storage))
    }

    pub fn from_parts(db: Arc<dyn Store>, config: Arc<AppConfig>, storage: Arc<dyn StorageClient>) -> Self {
        let tokens = TokenGuard::new(&config.jwt);
        Self {
            db,
            config,
            storage,
            tokens,
        }
    }

    /// In-memory store and storage over `AppConfig::for_tests`.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig::for_tests());
        let storage = Arc::new(MemoryStorage::new(&config.storage.public_url));
        Self::from_parts(Arc::new(MemoryStore::new()), config, storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destinations::repo::DestinationRepo;

    #[tokio::test]
    async fn fake_state_starts_empty() {
        let state = AppState::fake();
        assert_eq!(state.db.count_destinations().await.unwrap(), 0);
        assert_eq!(state.tokens.ttl_minutes(), 60);
        assert!(!state.storage.exists("destinations/x.png").await.unwrap());
    }
}
