//! Token revocation (logout) endpoint.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

use greenai_core::error::AppError;

use crate::dto::response::{ApiResponse, RevokeResponse};
use crate::error::ApiError;
use crate::extractors::bearer_token;
use crate::state::AppState;

/// POST /api/auth/revoke
///
/// Revokes the presented bearer token; later socket connects with it are refused.
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<RevokeResponse>>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::invalid_credential("Missing bearer token"))?;
    let identity = state.engine.revoke_credential(token).await?;

    Ok(Json(ApiResponse::ok(RevokeResponse {
        user_id: identity.user_id,
        revoked: true,
    })))
}
