use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::auth::repo::UserRepo;
use crate::categories::repo::CategoryRepo;
use crate::destinations::repo::DestinationRepo;
use crate::messages::repo::MessageRepo;
use crate::validation::RecordLookup;

mod memory;

pub use memory::MemoryStore;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                RepoError::Conflict(db.constraint().unwrap_or_default().to_string())
            }
            other => RepoError::Database(other),
        }
    }
}

/// Everything the handlers need from persistence.
pub trait Store: UserRepo + DestinationRepo + MessageRepo + CategoryRepo + RecordLookup {}

impl<T> Store for T where T: UserRepo + DestinationRepo + MessageRepo + CategoryRepo + RecordLookup {}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pub db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        info!("migrations applied");
        Ok(())
    }
}

/// Tables reachable from rule tables. Names are interpolated into SQL, so
/// only these are accepted.
fn checked_table(table: &str) -> Result<&'static str, RepoError> {
    match table {
        "users" => Ok("users"),
        "categories" => Ok("categories"),
        "destinations" => Ok("destinations"),
        "messages" => Ok("messages"),
        other => Err(anyhow::anyhow!("unknown table {other:?}").into()),
    }
}

fn checked_column(column: &str) -> Result<&'static str, RepoError> {
    match column {
        "email" => Ok("email"),
        "name" => Ok("name"),
        other => Err(anyhow::anyhow!("unknown column {other:?}").into()),
    }
}

#[async_trait]
impl RecordLookup for PgStore {
    async fn id_exists(&self, table: &str, id: i64) -> Result<bool, RepoError> {
        let table = checked_table(table)?;
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)");
        let exists = sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }

    async fn value_taken(&self, table: &str, column: &str, value: &str) -> Result<bool, RepoError> {
        let table = checked_table(table)?;
        let column = checked_column(column)?;
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE {column} = $1)");
        let taken = sqlx::query_scalar::<_, bool>(&sql)
            .bind(value)
            .fetch_one(&self.db)
            .await?;
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(RepoError::from(sqlx::Error::RowNotFound), RepoError::NotFound));
        assert!(matches!(
            RepoError::from(sqlx::Error::PoolTimedOut),
            RepoError::Database(_)
        ));
    }

    #[test]
    fn lookup_rejects_unknown_identifiers() {
        assert!(checked_table("users").is_ok());
        assert!(checked_table("users; DROP TABLE users").is_err());
        assert!(checked_column("password_hash").is_err());
    }
}
