use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use super::dto::{MessageResource, MESSAGE_RULES};
use crate::{
    db::RepoError,
    error::ApiError,
    messages::{repo::MessageRepo, repo_types::MessageInput},
    resource::{window, Envelope, ListQuery, Listing},
    state::AppState,
    validation::{validate, Payload},
};

const NOT_FOUND: &str = "Message not found";

pub fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", get(index).post(store))
        .route("/messages/:id", get(show).put(update).delete(destroy))
}

fn internal<E: std::fmt::Display>(e: E) -> ApiError {
    error!(error = %e, "message request failed");
    ApiError::Internal("Something went wrong")
}

fn lookup_failed(e: RepoError) -> ApiError {
    match e {
        RepoError::NotFound => ApiError::NotFound(NOT_FOUND),
        other => internal(other),
    }
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::NotFound(NOT_FOUND))
}

#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    query: ListQuery,
) -> Result<Json<Listing<MessageResource>>, ApiError> {
    let limit = query.limit();
    let listing = match query.page() {
        Some(page) => {
            let (limit, offset) = window(page, limit);
            let rows = state.db.list_messages(limit, offset).await.map_err(internal)?;
            let total = state.db.count_messages().await.map_err(internal)?;
            let path = format!("{}/messages", state.config.app_url);
            Listing::paginated(rows, page, limit, total, &path)
        }
        None => Listing::plain(state.db.list_messages(limit, 0).await.map_err(internal)?),
    };
    Ok(Json(listing.map(MessageResource::from)))
}

#[instrument(skip(state, payload))]
pub async fn store(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<(StatusCode, Json<Envelope<MessageResource>>), ApiError> {
    let errors = validate(&payload, MESSAGE_RULES, state.db.as_ref())
        .await
        .map_err(internal)?;
    if !errors.is_empty() {
        warn!(fields = ?errors.keys().collect::<Vec<_>>(), "message rejected");
        return Err(ApiError::InvalidInput(errors));
    }

    let message = state
        .db
        .create_message(MessageInput::from(&payload))
        .await
        .map_err(internal)?;
    info!(message_id = message.id, "message created");
    Ok((StatusCode::CREATED, Json(Envelope::new(message.into()))))
}

#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<MessageResource>>, ApiError> {
    let id = parse_id(&id)?;
    let message = state.db.find_message(id).await.map_err(lookup_failed)?;
    Ok(Json(Envelope::new(message.into())))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Payload,
) -> Result<Json<Envelope<MessageResource>>, ApiError> {
    let id = parse_id(&id)?;
    state.db.find_message(id).await.map_err(lookup_failed)?;

    let errors = validate(&payload, MESSAGE_RULES, state.db.as_ref())
        .await
        .map_err(internal)?;
    if !errors.is_empty() {
        return Err(ApiError::InvalidInput(errors));
    }

    let message = state
        .db
        .update_message(id, MessageInput::from(&payload))
        .await
        .map_err(lookup_failed)?;
    info!(message_id = id, "message updated");
    Ok(Json(Envelope::new(message.into())))
}

#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;
    state.db.find_message(id).await.map_err(lookup_failed)?;
    state.db.delete_message(id).await.map_err(lookup_failed)?;

    info!(message_id = id, "message deleted");
    Ok(Json(serde_json::json!({ "message": "Message deleted successfully" })))
}
