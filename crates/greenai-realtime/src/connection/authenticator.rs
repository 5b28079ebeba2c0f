//! Connection authentication: verifies the bearer credential presented at connect.

use std::sync::Arc;

use tracing::warn;

use greenai_core::error::{AppError, ErrorKind};
use greenai_core::traits::IdentityVerifier;
use greenai_core::types::VerifiedIdentity;

/// Authenticates connections through the external identity verifier.
///
/// A failed check never reaches the registry.
#[derive(Debug, Clone)]
pub struct ConnectionAuthenticator {
    /// Identity verifier.
    verifier: Arc<dyn IdentityVerifier>,
}

impl ConnectionAuthenticator {
    /// Creates a new authenticator.
    pub fn new(verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { verifier }
    }

    /// Verifies a credential taken from a query parameter or `Authorization` header.
    pub async fn authenticate(&self, credential: Option<&str>) -> Result<VerifiedIdentity, AppError> {
        let credential = credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::invalid_credential("Authentication required"))?;

        self.verifier.verify(credential).await.map_err(|e| {
            warn!(error = %e, "Connection refused");
            match e.kind {
                ErrorKind::InvalidCredential => e,
                _ => AppError::invalid_credential(e.message),
            }
        })
    }

    /// Revokes a credential so it can no longer open connections.
    pub async fn revoke(&self, credential: &str) -> Result<VerifiedIdentity, AppError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(AppError::invalid_credential("Authentication required"));
        }
        self.verifier.revoke(credential).await.map_err(|e| match e.kind {
            ErrorKind::InvalidCredential => e,
            _ => AppError::invalid_credential(e.message),
        })
    }

    /// Drops revocations that have lapsed.
    pub fn purge_revoked(&self) -> usize {
        self.verifier.purge_revoked()
    }
}
