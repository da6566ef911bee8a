use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::jwt::Claims;
use super::repo::UserRepo;
use super::repo_types::User;
use super::services::TokenGuard;
use crate::db::RepoError;
use crate::error::ApiError;
use crate::state::AppState;

const UNAUTHENTICATED: &str = "Unauthenticated.";

/// The raw bearer credential, not yet validated.
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::Unauthorized(UNAUTHENTICATED))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized(UNAUTHENTICATED))?;

        Ok(BearerToken(token.to_string()))
    }
}

/// A request carrying a valid, non-invalidated token of an existing user.
pub struct AuthUser {
    pub user: User,
    pub claims: Claims,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;

        let guard = TokenGuard::from_ref(state);
        let claims = guard.verify(&token).await.map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            ApiError::Unauthorized(UNAUTHENTICATED)
        })?;

        let user = match state.db.find_user(claims.sub).await {
            Ok(user) => user,
            Err(RepoError::NotFound) => {
                warn!(user_id = claims.sub, "token subject no longer exists");
                return Err(ApiError::Unauthorized(UNAUTHENTICATED));
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = claims.sub, "user lookup failed");
                return Err(ApiError::Internal("Something went wrong"));
            }
        };

        Ok(AuthUser { user, claims, token })
    }
}
