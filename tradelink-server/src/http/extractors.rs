//! Custom Axum extractors

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::db::repos::{User, UserRepo};

use super::error::ApiError;
use super::server::AppState;

/// The authenticated user behind the request's bearer credential.
///
/// Resolution happens against the user store on every request; a missing
/// header, an unknown token, or an inactive user all reject with 401.
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let user = UserRepo::new(&state.pool)
            .find_by_token(token)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(Self(user))
    }
}
