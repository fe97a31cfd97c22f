use crate::application_port::AuthError;
use crate::domain_model::{AccessToken, Claims, RefreshToken, TokenPair, TokenType, UserId};
use chrono::{DateTime, Utc};

/// Pure minting and parsing of locally signed tokens.
pub trait TokenCodec: Send + Sync {
    fn mint_access(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError>;

    /// Returns the token and its expiry so the caller can size a TTL.
    fn mint_refresh(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError>;

    fn parse(
        &self,
        raw: &str,
        expected: TokenType,
        now: DateTime<Utc>,
    ) -> Result<Claims, AuthError>;

    /// Like `parse` but accepts tokens past their expiry. Signature and type
    /// are still enforced.
    fn parse_allow_expired(&self, raw: &str, expected: TokenType) -> Result<Claims, AuthError>;
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    async fn mint(&self, user_id: UserId) -> Result<TokenPair, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
    async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError>;
}
