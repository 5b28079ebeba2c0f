//! Bearer credential verification.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::identity::VerifiedIdentity;

/// Verifies a bearer credential presented at connection time.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + std::fmt::Debug + 'static {
    /// Returns the verified identity, or an `InvalidCredential` error.
    async fn verify(&self, credential: &str) -> AppResult<VerifiedIdentity>;

    /// Revokes a still-valid credential so later `verify` calls refuse it.
    ///
    /// Returns the identity the credential belonged to.
    async fn revoke(&self, credential: &str) -> AppResult<VerifiedIdentity>;

    /// Drops revocations whose credentials have expired on their own.
    fn purge_revoked(&self) -> usize {
        0
    }
}
