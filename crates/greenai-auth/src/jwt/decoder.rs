//! JWT token validation and revocation checking.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::{debug, warn};
use uuid::Uuid;

use greenai_core::config::AuthConfig;
use greenai_core::error::AppError;
use greenai_core::result::AppResult;
use greenai_core::traits::IdentityVerifier;
use greenai_core::types::VerifiedIdentity;

use super::claims::Claims;

/// Validates JWT access tokens and rejects revoked token IDs.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
    /// Revoked JWT IDs mapped to the instant the token would have expired anyway.
    revoked: Arc<DashMap<Uuid, DateTime<Utc>>>,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .field("revoked", &self.revoked.len())
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            revoked: Arc::new(DashMap::new()),
        }
    }

    /// Decodes and validates an access token string.
    pub fn decode_access_token(&self, token: &str) -> AppResult<Claims> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::invalid_credential("Authentication required"));
        }

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::invalid_credential("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::invalid_credential("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::invalid_credential("Invalid token signature")
                    }
                    _ => AppError::invalid_credential(format!("Token validation failed: {e}")),
                }
            })?;

        let claims = token_data.claims;
        if self.is_revoked(&claims.jti) {
            return Err(AppError::invalid_credential("Token has been revoked"));
        }

        Ok(claims)
    }

    /// Revokes a token ID until its natural expiry.
    pub fn revoke_jti(&self, jti: Uuid, until: DateTime<Utc>) {
        debug!(jti = %jti, until = %until, "Token revoked");
        self.revoked.insert(jti, until);
    }

    /// Revokes the token the claims were decoded from.
    pub fn revoke_claims(&self, claims: &Claims) {
        self.revoke_jti(claims.jti, claims.expires_at());
    }

    /// Returns whether the given token ID is currently revoked.
    pub fn is_revoked(&self, jti: &Uuid) -> bool {
        self.revoked
            .get(jti)
            .map(|until| *until > Utc::now())
            .unwrap_or(false)
    }

    /// Drops revocation entries whose tokens have expired on their own.
    pub fn purge_revocations(&self) -> usize {
        let now = Utc::now();
        let before = self.revoked.len();
        self.revoked.retain(|_, until| *until > now);
        let removed = before.saturating_sub(self.revoked.len());
        if removed > 0 {
            debug!(removed = removed, "Purged expired token revocations");
        }
        removed
    }
}

#[async_trait]
impl IdentityVerifier for JwtDecoder {
    async fn verify(&self, credential: &str) -> AppResult<VerifiedIdentity> {
        let credential = credential.strip_prefix("Bearer ").unwrap_or(credential);
        match self.decode_access_token(credential) {
            Ok(claims) => Ok(claims.into_identity()),
            Err(e) => {
                warn!(error = %e, "Credential rejected");
                Err(e)
            }
        }
    }

    async fn revoke(&self, credential: &str) -> AppResult<VerifiedIdentity> {
        let credential = credential.strip_prefix("Bearer ").unwrap_or(credential);
        let claims = self.decode_access_token(credential)?;
        self.revoke_claims(&claims);
        Ok(claims.into_identity())
    }

    fn purge_revoked(&self) -> usize {
        self.purge_revocations()
    }
}

#[cfg(test)]
mod tests {
    use greenai_core::error::ErrorKind;
    use greenai_core::types::{UserId, UserRole};
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;
    use crate::jwt::JwtEncoder;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_access_ttl_minutes: 10,
            leeway_seconds: 0,
        }
    }

    fn identity() -> VerifiedIdentity {
        VerifiedIdentity {
            user_id: UserId::new(),
            username: "ravi".to_string(),
            role: UserRole::Farmer,
            is_verified: true,
        }
    }

    #[tokio::test]
    async fn verifies_issued_token() {
        let config = config();
        let id = identity();
        let token = JwtEncoder::new(&config).issue(&id).unwrap();
        let verified = JwtDecoder::new(&config).verify(&token).await.unwrap();
        assert_eq!(verified, id);
    }

    #[tokio::test]
    async fn accepts_bearer_prefix() {
        let config = config();
        let token = JwtEncoder::new(&config).issue(&identity()).unwrap();
        let verified = JwtDecoder::new(&config)
            .verify(&format!("Bearer {token}"))
            .await;
        assert!(verified.is_ok());
    }

    #[tokio::test]
    async fn rejects_wrong_secret() {
        let token = JwtEncoder::new(&config()).issue(&identity()).unwrap();
        let other = AuthConfig {
            jwt_secret: "another-secret".to_string(),
            ..config()
        };
        let err = JwtDecoder::new(&other).verify(&token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCredential);
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let config = config();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "old".to_string(),
            role: UserRole::Expert,
            is_verified: false,
            iat: now - 7200,
            exp: now - 3600,
            jti: Uuid::new_v4(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        let err = JwtDecoder::new(&config).verify(&token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCredential);
        assert!(err.message.contains("expired"));
    }

    #[tokio::test]
    async fn rejects_garbage_and_empty() {
        let decoder = JwtDecoder::new(&config());
        assert!(decoder.verify("not-a-token").await.is_err());
        assert!(decoder.verify("").await.is_err());
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let config = config();
        let encoder = JwtEncoder::new(&config);
        let decoder = JwtDecoder::new(&config);
        let token = encoder.issue(&identity()).unwrap();
        let claims = decoder.decode_access_token(&token).unwrap();

        decoder.revoke_claims(&claims);
        let err = decoder.verify(&token).await.unwrap_err();
        assert!(err.message.contains("revoked"));
    }

    #[tokio::test]
    async fn revoke_through_verifier_returns_owner_and_refuses_reuse() {
        let config = config();
        let id = identity();
        let token = JwtEncoder::new(&config).issue(&id).unwrap();
        let decoder = JwtDecoder::new(&config);

        let owner = decoder.revoke(&format!("Bearer {token}")).await.unwrap();
        assert_eq!(owner, id);

        let err = decoder.verify(&token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCredential);
        assert!(decoder.revoke(&token).await.is_err());
        assert_eq!(decoder.purge_revoked(), 0);
    }

    #[test]
    fn purge_drops_lapsed_revocations() {
        let decoder = JwtDecoder::new(&config());
        decoder.revoke_jti(Uuid::new_v4(), Utc::now() - chrono::Duration::seconds(1));
        decoder.revoke_jti(Uuid::new_v4(), Utc::now() + chrono::Duration::hours(1));
        assert_eq!(decoder.purge_revocations(), 1);
    }
}
