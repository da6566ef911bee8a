use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{MessageResponse, RegisterResponse, TokenResponse, LOGIN_RULES, REGISTER_RULES},
        extractors::{AuthUser, BearerToken},
        password::hash_password,
        repo::UserRepo,
        repo_types::{NewUser, User},
        services::TokenGuard,
    },
    db::RepoError,
    error::ApiError,
    state::AppState,
    validation::{taken_message, validate, FieldErrors, Payload},
};

const SERVER_FAULT: &str = "Something went wrong";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/user", get(me))
        .route("/logout", get(logout))
}

/// A registration that loses the race for an email after passing the
/// `unique` rule gets the same answer as one that failed it.
fn create_failed(e: RepoError) -> ApiError {
    match e {
        RepoError::Conflict(constraint) => {
            warn!(%constraint, "email registered concurrently");
            let mut errors = FieldErrors::new();
            errors.insert("email".into(), vec![taken_message("email")]);
            ApiError::Validation(errors)
        }
        other => {
            error!(error = %other, "create user failed");
            ApiError::Internal(SERVER_FAULT)
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let errors = validate(&payload, REGISTER_RULES, state.db.as_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "register validation lookup failed");
            ApiError::Internal(SERVER_FAULT)
        })?;
    if !errors.is_empty() {
        warn!(fields = ?errors.keys().collect::<Vec<_>>(), "register rejected");
        return Err(ApiError::Validation(errors));
    }

    // Rules guarantee these are present strings.
    let name = payload.text("name").unwrap_or_default().to_string();
    let email = payload.text("email").unwrap_or_default().to_string();
    let password = payload.text("password").unwrap_or_default();

    let password_hash = hash_password(password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        ApiError::Internal(SERVER_FAULT)
    })?;

    let user = state
        .db
        .create_user(NewUser {
            name,
            email,
            password_hash,
        })
        .await
        .map_err(create_failed)?;

    let guard = TokenGuard::from_ref(&state);
    let token = guard.issue(user.id).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        ApiError::Internal(SERVER_FAULT)
    })?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "User registered successfully!",
            data: user,
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<TokenResponse>, ApiError> {
    let errors = validate(&payload, LOGIN_RULES, state.db.as_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "login validation lookup failed");
            ApiError::Internal(SERVER_FAULT)
        })?;
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let email = payload.text("email").unwrap_or_default().trim();
    let password = payload.text("password").unwrap_or_default();

    let guard = TokenGuard::from_ref(&state);
    match guard.attempt(state.db.as_ref(), email, password).await {
        Ok(Some(token)) => Ok(Json(TokenResponse::bearer(token, guard.ttl_minutes()))),
        Ok(None) => Err(ApiError::Unauthorized("Unauthorized access.")),
        Err(e) => {
            error!(error = %e, "login attempt failed");
            Err(ApiError::Internal(SERVER_FAULT))
        }
    }
}

#[instrument(skip(auth), fields(user_id = auth.user.id))]
pub async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    let guard = TokenGuard::from_ref(&state);
    match guard.invalidate(&auth.token).await {
        Ok(()) => {
            info!(jti = %auth.claims.jti, "user logged out");
            Ok(Json(MessageResponse {
                message: "Successfully logged out.",
            }))
        }
        Err(e) => {
            error!(error = %e, "logout failed");
            Err(ApiError::Internal("Failed to log out."))
        }
    }
}

#[instrument(skip(state, token))]
pub async fn refresh(
    State(state): State<AppState>,
    token: Option<BearerToken>,
) -> Result<Json<TokenResponse>, ApiError> {
    const FAILED: ApiError = ApiError::Internal("Failed to refresh token.");

    let Some(BearerToken(token)) = token else {
        warn!("refresh without bearer token");
        return Err(FAILED);
    };

    let guard = TokenGuard::from_ref(&state);
    let fresh = guard.refresh(&token).await.map_err(|e| {
        warn!(error = %e, "token refresh failed");
        FAILED
    })?;
    Ok(Json(TokenResponse::bearer(fresh, guard.ttl_minutes())))
}
