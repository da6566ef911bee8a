use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use super::dto::{DestinationResource, DESTINATION_RULES};
use super::services::{discard_image, store_image};
use crate::{
    db::RepoError,
    destinations::{repo::DestinationRepo, repo_types::DestinationInput},
    error::ApiError,
    resource::{window, Envelope, ListQuery, Listing},
    state::AppState,
    validation::{validate, Payload},
};

const NOT_FOUND: &str = "Destination not found";

pub fn destination_routes() -> Router<AppState> {
    Router::new()
        .route("/destinations", get(index).post(store))
        .route("/destinations/:id", get(show).put(update).delete(destroy))
}

fn internal<E: std::fmt::Display>(e: E) -> ApiError {
    error!(error = %e, "destination request failed");
    ApiError::Internal("Something went wrong")
}

fn lookup_failed(e: RepoError) -> ApiError {
    match e {
        RepoError::NotFound => ApiError::NotFound(NOT_FOUND),
        other => internal(other),
    }
}

/// Non-numeric ids can never match a row.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::NotFound(NOT_FOUND))
}

fn destination_input(payload: &Payload, image: Option<String>) -> DestinationInput {
    let text = |field: &str| payload.text(field).unwrap_or_default().to_string();
    DestinationInput {
        user_id: payload.id("user_id"),
        category_id: payload.id("category_id"),
        name: text("name"),
        location: text("location"),
        image,
        description: text("description"),
    }
}

#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    query: ListQuery,
) -> Result<Json<Listing<DestinationResource>>, ApiError> {
    let limit = query.limit();
    let listing = match query.page() {
        Some(page) => {
            let (limit, offset) = window(page, limit);
            let rows = state.db.list_destinations(limit, offset).await.map_err(internal)?;
            let total = state.db.count_destinations().await.map_err(internal)?;
            let path = format!("{}/destinations", state.config.app_url);
            Listing::paginated(rows, page, limit, total, &path)
        }
        None => Listing::plain(state.db.list_destinations(limit, 0).await.map_err(internal)?),
    };

    let storage = state.storage.as_ref();
    Ok(Json(listing.map(|d| DestinationResource::new(d, storage))))
}

#[instrument(skip(state, payload))]
pub async fn store(
    State(state): State<AppState>,
    mut payload: Payload,
) -> Result<(StatusCode, Json<Envelope<DestinationResource>>), ApiError> {
    let errors = validate(&payload, DESTINATION_RULES, state.db.as_ref())
        .await
        .map_err(internal)?;
    if !errors.is_empty() {
        warn!(fields = ?errors.keys().collect::<Vec<_>>(), "destination rejected");
        return Err(ApiError::InvalidInput(errors));
    }

    let image = match payload.take_file("image") {
        Some(file) => Some(store_image(state.storage.as_ref(), file).await.map_err(internal)?),
        None => None,
    };

    let destination = state
        .db
        .create_destination(destination_input(&payload, image))
        .await
        .map_err(internal)?;

    info!(destination_id = destination.id, "destination created");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::new(DestinationResource::new(destination, state.storage.as_ref()))),
    ))
}

#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<DestinationResource>>, ApiError> {
    let id = parse_id(&id)?;
    let destination = state.db.find_destination(id).await.map_err(lookup_failed)?;
    Ok(Json(Envelope::new(DestinationResource::new(destination, state.storage.as_ref()))))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut payload: Payload,
) -> Result<Json<Envelope<DestinationResource>>, ApiError> {
    let id = parse_id(&id)?;
    let existing = state.db.find_destination(id).await.map_err(lookup_failed)?;

    let errors = validate(&payload, DESTINATION_RULES, state.db.as_ref())
        .await
        .map_err(internal)?;
    if !errors.is_empty() {
        warn!(destination_id = id, fields = ?errors.keys().collect::<Vec<_>>(), "destination update rejected");
        return Err(ApiError::InvalidInput(errors));
    }

    let storage = state.storage.as_ref();
    let mut image = existing.image;
    if let Some(file) = payload.take_file("image") {
        if let Some(old) = image.as_deref() {
            discard_image(storage, old).await.map_err(internal)?;
        }
        image = Some(store_image(storage, file).await.map_err(internal)?);
    }

    let destination = state
        .db
        .update_destination(id, destination_input(&payload, image))
        .await
        .map_err(lookup_failed)?;

    info!(destination_id = id, "destination updated");
    Ok(Json(Envelope::new(DestinationResource::new(destination, storage))))
}

#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;
    let existing = state.db.find_destination(id).await.map_err(lookup_failed)?;

    if let Some(key) = existing.image.as_deref() {
        discard_image(state.storage.as_ref(), key).await.map_err(internal)?;
    }
    state.db.delete_destination(id).await.map_err(lookup_failed)?;

    info!(destination_id = id, "destination deleted");
    Ok(Json(serde_json::json!({ "message": "Destination deleted successfully" })))
}
