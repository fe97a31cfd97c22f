use crate::application_port::AuthError;
use crate::domain_model::Claims;

/// Verifies a bearer credential and yields its claims.
///
/// Fails with [`AuthError::InvalidCredential`] when signature, issuer, audience
/// or expiry checks fail. Transport failures surface as
/// [`AuthError::IdentityProvider`] so callers can tell them apart.
#[async_trait::async_trait]
pub trait AuthClient: Send + Sync {
    async fn verify(&self, raw_token: &str) -> Result<Claims, AuthError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProfile {
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Provider sub-identifier such as `google.com` or `password`.
    pub provider_id: String,
}

#[async_trait::async_trait]
pub trait ProfileSource: Send + Sync {
    async fn lookup(&self, subject: &str) -> Result<FederatedProfile, AuthError>;
}

/// Removes an optional `Bearer` prefix (case-insensitive) and surrounding whitespace.
pub fn strip_bearer(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {
            let rest = &trimmed[6..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest.trim_start()
            } else {
                trimmed
            }
        }
        _ => trimmed,
    }
}
