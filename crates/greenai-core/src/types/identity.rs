//! Verified identity produced by the external credential check.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Community role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// A farmer (default registration role).
    Farmer,
    /// An agricultural expert.
    Expert,
    /// A forum moderator.
    Moderator,
    /// A platform administrator.
    Admin,
}

impl UserRole {
    /// Converts to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Farmer => "farmer",
            Self::Expert => "expert",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity asserted by a verified bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    /// User ID.
    pub user_id: UserId,
    /// Display username.
    pub username: String,
    /// Community role.
    pub role: UserRole,
    /// Whether the account has been verified.
    pub is_verified: bool,
}
