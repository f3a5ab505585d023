use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{jwt::JwtKeys, repo_types::User};
use crate::{error::AppError, state::AppState};

pub const NOT_AUTHORIZED: &str = "Not authorized";

/// The account behind a valid bearer session.
///
/// The JWT must verify and must still be the session stored on the user, so
/// a token stops working as soon as its owner logs out.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized(NOT_AUTHORIZED))?;

        let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::unauthorized(NOT_AUTHORIZED)
        })?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized(NOT_AUTHORIZED))?;

        if !user.holds_session(token) {
            warn!(user_id = %user.id, "token no longer matches stored session");
            return Err(AppError::unauthorized(NOT_AUTHORIZED));
        }

        Ok(AuthUser(user))
    }
}
