//! JWT claims structure carried by access tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use greenai_core::types::{UserId, UserRole, VerifiedIdentity};

/// JWT claims payload embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user ID.
    pub sub: Uuid,
    /// Username for display.
    pub username: String,
    /// User role at the time of token issuance.
    pub role: UserRole,
    /// Whether the account was verified at issuance.
    #[serde(default)]
    pub is_verified: bool,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// JWT ID for revocation tracking.
    pub jti: Uuid,
}

impl Claims {
    /// Returns the user ID from the subject claim.
    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(self.sub)
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Converts the claims into the identity handed to the realtime core.
    pub fn into_identity(self) -> VerifiedIdentity {
        VerifiedIdentity {
            user_id: UserId::from_uuid(self.sub),
            username: self.username,
            role: self.role,
            is_verified: self.is_verified,
        }
    }
}
