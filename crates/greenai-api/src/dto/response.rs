//! Response DTOs.

use serde::{Deserialize, Serialize};

use greenai_core::types::UserId;
use greenai_realtime::server::EngineHealth;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `shutting_down` once shutdown has begun.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since startup.
    pub uptime_seconds: u64,
    /// Engine counters.
    pub realtime: EngineHealth,
}

/// Usage check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageCheckResponse {
    /// Resource type checked.
    pub resource: String,
    /// Whether another use is allowed.
    pub allowed: bool,
    /// Uses in the current period.
    pub current: u64,
    /// Plan limit, absent when unlimited.
    pub limit: Option<u64>,
    /// Uses left, absent when unlimited.
    pub remaining: Option<u64>,
}

/// Usage track result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageTrackResponse {
    /// Resource type tracked.
    pub resource: String,
    /// Counter value after the increment.
    pub current: u64,
}

/// Token revocation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeResponse {
    /// Owner of the revoked token.
    pub user_id: UserId,
    /// Always `true` on success.
    pub revoked: bool,
}
