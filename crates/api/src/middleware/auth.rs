//! Bearer-token extractor identifying the club member behind a request.
//!
//! The member id becomes the acting user of join/leave/role edits; the
//! target user defaults to it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use musicclub_core::error::CoreError;
use musicclub_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Club member resolved from the `Authorization: Bearer` token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Acting user for participation changes (from `claims.sub`).
    pub user_id: DbId,
    /// `admin` or `member`.
    pub role: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}
