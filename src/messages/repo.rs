use async_trait::async_trait;

use crate::db::{PgStore, RepoError};
use crate::messages::repo_types::{Message, MessageInput};

#[async_trait]
pub trait MessageRepo: Send + Sync {
    async fn list_messages(&self, limit: i64, offset: i64) -> Result<Vec<Message>, RepoError>;
    async fn count_messages(&self) -> Result<i64, RepoError>;
    async fn find_message(&self, id: i64) -> Result<Message, RepoError>;
    async fn create_message(&self, input: MessageInput) -> Result<Message, RepoError>;
    async fn update_message(&self, id: i64, input: MessageInput) -> Result<Message, RepoError>;
    async fn delete_message(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
impl MessageRepo for PgStore {
    async fn list_messages(&self, limit: i64, offset: i64) -> Result<Vec<Message>, RepoError> {
        let rows = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, name, email, message, created_at, updated_at
            FROM messages
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

    async fn count_messages(&self) -> Result<i64, RepoError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.db)
            .await?;
        Ok(total)
    }

    async fn find_message(&self, id: i64) -> Result<Message, RepoError> {
        let row = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, name, email, message, created_at, updated_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn create_message(&self, input: MessageInput) -> Result<Message, RepoError> {
        let row = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (name, email, message)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, message, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.message)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_message(&self, id: i64, input: MessageInput) -> Result<Message, RepoError> {
        let row = sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages
               SET name = $2, email = $3, message = $4, updated_at = now()
             WHERE id = $1
            RETURNING id, name, email, message, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.message)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete_message(&self, id: i64) -> Result<(), RepoError> {
        let done = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if done.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
