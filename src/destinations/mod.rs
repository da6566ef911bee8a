use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use dto::{DestinationResource, DESTINATION_RULES};

pub fn router() -> Router<AppState> {
    handlers::destination_routes()
}
