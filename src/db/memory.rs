//! In-process store used by tests and by local runs without `DATABASE_URL`.
//!
//! Mirrors the constraints of the SQL schema: unique user emails, unique
//! category names and the nullable foreign keys on destinations.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::RepoError;
use crate::auth::repo::UserRepo;
use crate::auth::repo_types::{NewUser, User};
use crate::categories::repo::{Category, CategoryRepo};
use crate::destinations::repo::DestinationRepo;
use crate::destinations::repo_types::{Destination, DestinationInput};
use crate::messages::repo::MessageRepo;
use crate::messages::repo_types::{Message, MessageInput};
use crate::validation::RecordLookup;

struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T: Clone> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn get(&self, id: i64) -> Result<T, RepoError> {
        self.rows.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    fn page(&self, limit: i64, offset: i64) -> Vec<T> {
        self.rows
            .values()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct Tables {
    users: Table<User>,
    categories: Table<Category>,
    destinations: Table<Destination>,
    messages: Table<Message>,
}

impl Tables {
    fn check_foreign_keys(&self, input: &DestinationInput) -> Result<(), RepoError> {
        if let Some(user_id) = input.user_id {
            if !self.users.rows.contains_key(&user_id) {
                return Err(anyhow::anyhow!("destinations.user_id references missing user {user_id}").into());
            }
        }
        if let Some(category_id) = input.category_id {
            if !self.categories.rows.contains_key(&category_id) {
                return Err(
                    anyhow::anyhow!("destinations.category_id references missing category {category_id}").into(),
                );
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_user(&self, id: i64) -> Result<User, RepoError> {
        self.tables.read().await.users.get(id)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.rows.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, new: NewUser) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.rows.values().any(|u| u.email == new.email) {
            return Err(RepoError::Conflict("users_email_key".into()));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: tables.users.next_id(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            email_verified_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.rows.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl CategoryRepo for MemoryStore {
    async fn upsert_category(&self, name: &str) -> Result<Category, RepoError> {
        let mut tables = self.tables.write().await;
        let now = OffsetDateTime::now_utc();
        if let Some(existing) = tables.categories.rows.values_mut().find(|c| c.name == name) {
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let category = Category {
            id: tables.categories.next_id(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.categories.rows.insert(category.id, category.clone());
        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepoError> {
        Ok(self.tables.read().await.categories.rows.values().cloned().collect())
    }
}

#[async_trait]
impl DestinationRepo for MemoryStore {
    async fn list_destinations(&self, limit: i64, offset: i64) -> Result<Vec<Destination>, RepoError> {
        Ok(self.tables.read().await.destinations.page(limit, offset))
    }

    async fn count_destinations(&self) -> Result<i64, RepoError> {
        Ok(self.tables.read().await.destinations.rows.len() as i64)
    }

    async fn find_destination(&self, id: i64) -> Result<Destination, RepoError> {
        self.tables.read().await.destinations.get(id)
    }

    async fn create_destination(&self, input: DestinationInput) -> Result<Destination, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_foreign_keys(&input)?;
        let now = OffsetDateTime::now_utc();
        let row = Destination {
            id: tables.destinations.next_id(),
            user_id: input.user_id,
            category_id: input.category_id,
            name: input.name,
            location: input.location,
            image: input.image,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        tables.destinations.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_destination(&self, id: i64, input: DestinationInput) -> Result<Destination, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_foreign_keys(&input)?;
        let row = tables.destinations.rows.get_mut(&id).ok_or(RepoError::NotFound)?;
        row.user_id = input.user_id;
        row.category_id = input.category_id;
        row.name = input.name;
        row.location = input.location;
        row.image = input.image;
        row.description = input.description;
        row.updated_at = OffsetDateTime::now_utc();
        Ok(row.clone())
    }

    async fn delete_destination(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.destinations.rows.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl MessageRepo for MemoryStore {
    async fn list_messages(&self, limit: i64, offset: i64) -> Result<Vec<Message>, RepoError> {
        Ok(self.tables.read().await.messages.page(limit, offset))
    }

    async fn count_messages(&self) -> Result<i64, RepoError> {
        Ok(self.tables.read().await.messages.rows.len() as i64)
    }

    async fn find_message(&self, id: i64) -> Result<Message, RepoError> {
        self.tables.read().await.messages.get(id)
    }

    async fn create_message(&self, input: MessageInput) -> Result<Message, RepoError> {
        let mut tables = self.tables.write().await;
        let now = OffsetDateTime::now_utc();
        let row = Message {
            id: tables.messages.next_id(),
            name: input.name,
            email: input.email,
            message: input.message,
            created_at: now,
            updated_at: now,
        };
        tables.messages.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_message(&self, id: i64, input: MessageInput) -> Result<Message, RepoError> {
        let mut tables = self.tables.write().await;
        let row = tables.messages.rows.get_mut(&id).ok_or(RepoError::NotFound)?;
        row.name = input.name;
        row.email = input.email;
        row.message = input.message;
        row.updated_at = OffsetDateTime::now_utc();
        Ok(row.clone())
    }

    async fn delete_message(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.messages.rows.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl RecordLookup for MemoryStore {
    async fn id_exists(&self, table: &str, id: i64) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        match table {
            "users" => Ok(tables.users.rows.contains_key(&id)),
            "categories" => Ok(tables.categories.rows.contains_key(&id)),
            "destinations" => Ok(tables.destinations.rows.contains_key(&id)),
            "messages" => Ok(tables.messages.rows.contains_key(&id)),
            other => Err(anyhow::anyhow!("unknown table {other:?}").into()),
        }
    }

    async fn value_taken(&self, table: &str, column: &str, value: &str) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        match (table, column) {
            ("users", "email") => Ok(tables.users.rows.values().any(|u| u.email == value)),
            ("categories", "name") => Ok(tables.categories.rows.values().any(|c| c.name == value)),
            other => Err(anyhow::anyhow!("unknown lookup {other:?}").into()),
        }
    }
}
