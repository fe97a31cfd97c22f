use crate::application_port::AuthError;
use crate::domain_model::*;
use std::time::Duration;

/// Liveness records for issued refresh tokens, keyed by `(user, token)`.
/// Presence of a record is the only signal that a refresh token is honored.
#[async_trait::async_trait]
pub trait RevocationStore: Send + Sync {
    /// `ttl` must not outlive the token's own expiry.
    async fn mark_live(
        &self,
        user_id: UserId,
        refresh_token: &RefreshToken,
        ttl: Duration,
    ) -> Result<(), AuthError>;

    async fn is_live(&self, user_id: UserId, refresh_token: &RefreshToken)
    -> Result<bool, AuthError>;

    /// Idempotent: revoking an unknown token succeeds.
    async fn revoke(&self, user_id: UserId, refresh_token: &RefreshToken)
    -> Result<(), AuthError>;
}

/// Composite key shared by every backend: `{prefix}:{user_id}:{refresh_token}`.
pub fn revocation_key(prefix: &str, user_id: UserId, refresh_token: &RefreshToken) -> String {
    format!("{}:{}:{}", prefix, user_id, refresh_token.0)
}

pub const DEFAULT_REVOCATION_PREFIX: &str = "refresh_token";
