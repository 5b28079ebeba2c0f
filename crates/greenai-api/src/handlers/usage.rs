//! Membership usage endpoints.

use axum::Json;
use axum::extract::State;
use tracing::debug;

use greenai_core::types::UsageRecord;

use crate::dto::request::{UsageCheckRequest, UsageTrackRequest, validated};
use crate::dto::response::{ApiResponse, UsageCheckResponse, UsageTrackResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/membership/usage/check
pub async fn check_usage(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UsageCheckRequest>,
) -> Result<Json<ApiResponse<UsageCheckResponse>>, ApiError> {
    let body = validated(body)?;
    let check = state.engine.check_limit(user.user_id, &body.resource).await;

    Ok(Json(ApiResponse::ok(UsageCheckResponse {
        resource: body.resource,
        allowed: check.allowed,
        current: check.current,
        limit: check.limit,
        remaining: check.remaining(),
    })))
}

/// POST /api/membership/usage/track
pub async fn track_usage(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UsageTrackRequest>,
) -> Result<Json<ApiResponse<UsageTrackResponse>>, ApiError> {
    let body = validated(body)?;
    let current = state
        .engine
        .increment(user.user_id, &body.resource, body.amount)
        .await?;
    debug!(user_id = %user.user_id, resource = %body.resource, current, "Usage tracked");

    Ok(Json(ApiResponse::ok(UsageTrackResponse {
        resource: body.resource,
        current,
    })))
}

/// GET /api/membership/usage
pub async fn list_usage(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<UsageRecord>>>, ApiError> {
    let records = state.engine.usage_for(user.user_id).await?;
    Ok(Json(ApiResponse::ok(records)))
}
