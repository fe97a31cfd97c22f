use crate::domain_model::{TokenPair, User, UserId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credential")]
    InvalidCredential,
    #[error("token invalid")]
    InvalidToken,
    #[error("token revoked")]
    Revoked,
    #[error("user not found")]
    NotFound,
    #[error("user already exists")]
    UserExists,
    #[error("identity provider error: {0}")]
    IdentityProvider(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Backend failures the caller may retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::IdentityProvider(_) | AuthError::Store(_))
    }
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: User,
    pub tokens: TokenPair,
}

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    /// Verifies a federated identity token, creating the local user on first
    /// sight, and mints a session for it.
    async fn verify_federated_login(&self, federated_token: &str)
    -> Result<LoginResult, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
    async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError>;
    /// Mints a session for an existing user without federated verification.
    /// Must only be reachable outside production.
    async fn issue_test_token(&self, user_id: UserId) -> Result<TokenPair, AuthError>;
}
