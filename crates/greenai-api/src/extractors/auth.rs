//! `AuthUser` extractor: pulls the bearer token from the Authorization header and verifies it.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use greenai_core::error::AppError;
use greenai_core::types::VerifiedIdentity;

use crate::error::ApiError;
use crate::state::AppState;

/// Verified caller identity available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub VerifiedIdentity);

impl std::ops::Deref for AuthUser {
    type Target = VerifiedIdentity;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Token from an `Authorization: Bearer <token>` header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::invalid_credential("Missing bearer token"))?;

        let identity = state.verifier.verify(token).await?;
        Ok(AuthUser(identity))
    }
}
