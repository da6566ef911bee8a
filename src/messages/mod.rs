use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

pub use dto::{MessageResource, MESSAGE_RULES};

pub fn router() -> Router<AppState> {
    handlers::message_routes()
}
