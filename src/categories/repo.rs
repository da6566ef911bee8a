use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::db::{PgStore, RepoError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[async_trait]
pub trait CategoryRepo: Send + Sync {
    /// Inserts `name`, or touches the existing row with that name.
    async fn upsert_category(&self, name: &str) -> Result<Category, RepoError>;
    async fn list_categories(&self) -> Result<Vec<Category>, RepoError>;
}

#[async_trait]
impl CategoryRepo for PgStore {
    async fn upsert_category(&self, name: &str) -> Result<Category, RepoError> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET updated_at = now()
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepoError> {
        let rows = sqlx::query_as::<_, Category>(
            r#"SELECT id, name, created_at, updated_at FROM categories ORDER BY id"#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
