use serde::Serialize;
use time::OffsetDateTime;

use crate::destinations::repo_types::Destination;
use crate::storage::StorageClient;
use crate::validation::{Rule, RuleTable};

pub const DESTINATION_RULES: RuleTable = &[
    ("user_id", &[Rule::Nullable, Rule::ExistsId("users")]),
    ("category_id", &[Rule::Nullable, Rule::ExistsId("categories")]),
    ("name", &[Rule::Required, Rule::String, Rule::Max(255)]),
    ("location", &[Rule::Required, Rule::String, Rule::Max(255)]),
    (
        "image",
        &[
            Rule::Nullable,
            Rule::Image,
            Rule::Mimes(&["jpeg", "png", "jpg", "gif"]),
            Rule::Max(2048),
        ],
    ),
    ("description", &[Rule::Required, Rule::String]),
];

/// Public shape of a destination.
#[derive(Debug, Serialize)]
pub struct DestinationResource {
    pub id: i64,
    pub user_id: Option<i64>,
    pub category_id: Option<i64>,
    pub name: String,
    pub location: String,
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl DestinationResource {
    pub fn new(d: Destination, storage: &dyn StorageClient) -> Self {
        let image_url = d.image.as_deref().map(|key| storage.url(key));
        Self {
            id: d.id,
            user_id: d.user_id,
            category_id: d.category_id,
            name: d.name,
            location: d.location,
            image: d.image,
            image_url,
            description: d.description,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use time::macros::datetime;

    fn destination(image: Option<&str>) -> Destination {
        Destination {
            id: 4,
            user_id: None,
            category_id: Some(1),
            name: "Lake Bled".into(),
            location: "Slovenia".into(),
            image: image.map(Into::into),
            description: "Island church".into(),
            created_at: datetime!(2025-03-01 10:00 UTC),
            updated_at: datetime!(2025-03-02 10:00 UTC),
        }
    }

    #[test]
    fn resource_exposes_public_image_url() {
        let storage = MemoryStorage::new("http://localhost:8080/storage");
        let json = serde_json::to_value(DestinationResource::new(
            destination(Some("destinations/a.png")),
            &storage,
        ))
        .unwrap();

        assert_eq!(json["image"], "destinations/a.png");
        assert_eq!(json["image_url"], "http://localhost:8080/storage/destinations/a.png");
        assert_eq!(json["created_at"], "2025-03-01T10:00:00Z");
        assert!(json["user_id"].is_null());
    }

    #[test]
    fn resource_without_image_has_null_url() {
        let storage = MemoryStorage::new("http://localhost:8080/storage");
        let json = serde_json::to_value(DestinationResource::new(destination(None), &storage)).unwrap();
        assert!(json["image"].is_null());
        assert!(json["image_url"].is_null());
    }
}
