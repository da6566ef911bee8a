use async_trait::async_trait;

use crate::db::{PgStore, RepoError};
use crate::destinations::repo_types::{Destination, DestinationInput};

#[async_trait]
pub trait DestinationRepo: Send + Sync {
    /// Newest first (id descending).
    async fn list_destinations(&self, limit: i64, offset: i64) -> Result<Vec<Destination>, RepoError>;
    async fn count_destinations(&self) -> Result<i64, RepoError>;
    async fn find_destination(&self, id: i64) -> Result<Destination, RepoError>;
    async fn create_destination(&self, input: DestinationInput) -> Result<Destination, RepoError>;
    async fn update_destination(&self, id: i64, input: DestinationInput) -> Result<Destination, RepoError>;
    async fn delete_destination(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
impl DestinationRepo for PgStore {
    async fn list_destinations(&self, limit: i64, offset: i64) -> Result<Vec<Destination>, RepoError> {
        let rows = sqlx::query_as::<_, Destination>(
            r#"
            SELECT id, user_id, category_id, name, location, image, description, created_at, updated_at
            FROM destinations
            ORDER BY id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn count_destinations(&self) -> Result<i64, RepoError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM destinations")
            .fetch_one(&self.db)
            .await?;
        Ok(total)
    }

    async fn find_destination(&self, id: i64) -> Result<Destination, RepoError> {
        let row = sqlx::query_as::<_, Destination>(
            r#"
            SELECT id, user_id, category_id, name, location, image, description, created_at, updated_at
            FROM destinations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn create_destination(&self, input: DestinationInput) -> Result<Destination, RepoError> {
        let row = sqlx::query_as::<_, Destination>(
            r#"
            INSERT INTO destinations (user_id, category_id, name, location, image, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, category_id, name, location, image, description, created_at, updated_at
            "#,
        )
        .bind(input.user_id)
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.location)
        .bind(&input.image)
        .bind(&input.description)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_destination(&self, id: i64, input: DestinationInput) -> Result<Destination, RepoError> {
        let row = sqlx::query_as::<_, Destination>(
            r#"
            UPDATE destinations
               SET user_id = $2,
                   category_id = $3,
                   name = $4,
                   location = $5,
                   image = $6,
                   description = $7,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, user_id, category_id, name, location, image, description, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(input.user_id)
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.location)
        .bind(&input.image)
        .bind(&input.description)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete_destination(&self, id: i64) -> Result<(), RepoError> {
        let done = sqlx::query("DELETE FROM destinations WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if done.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
