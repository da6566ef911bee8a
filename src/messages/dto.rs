use serde::Serialize;
use time::OffsetDateTime;

use crate::messages::repo_types::{Message, MessageInput};
use crate::validation::{Payload, Rule, RuleTable};

pub const MESSAGE_RULES: RuleTable = &[
    ("name", &[Rule::Required, Rule::String, Rule::Max(255)]),
    ("email", &[Rule::Required, Rule::String, Rule::Max(255)]),
    ("message", &[Rule::Required, Rule::String]),
];

#[derive(Debug, Serialize)]
pub struct MessageResource {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Message> for MessageResource {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            message: m.message,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<&Payload> for MessageInput {
    fn from(payload: &Payload) -> Self {
        let text = |field: &str| payload.text(field).unwrap_or_default().to_string();
        Self {
            name: text("name"),
            email: text("email"),
            message: text("message"),
        }
    }
}
