use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Destination {
    pub id: i64,
    pub user_id: Option<i64>,
    pub category_id: Option<i64>,
    pub name: String,
    pub location: String,
    pub image: Option<String>, // path on the public disk
    pub description: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Writable columns, used for both insert and full update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationInput {
    pub user_id: Option<i64>,
    pub category_id: Option<i64>,
    pub name: String,
    pub location: String,
    pub image: Option<String>,
    pub description: String,
}
