use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::Clock;
use chrono::{DateTime, Duration as ChronoDuration};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Tolerated difference between the provider's clock and ours for `iat`.
const ALLOWED_SKEW_SECS: i64 = 60;

/// Provider sub-identifier reported when a subject has no linked sign-in method.
const ANONYMOUS_PROVIDER_ID: &str = "anonymous";

#[derive(Debug)]
pub struct FederatedConfig {
    pub verify_url: String,
    pub lookup_url: String,
    /// Expected `aud` of federated tokens (the provider project id).
    pub audience: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

/// Delegates token verification and profile lookup to the external identity
/// provider. Trusts the provider's verdict and performs no signature checks.
pub struct FederatedAuthClient {
    http: Client,
    verify_url: String,
    lookup_url: String,
    audience: String,
    api_key: SecretString,
    clock: Arc<dyn Clock>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    sub: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    local_id: [&'a str; 1],
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<ProviderUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    #[serde(default)]
    provider_user_info: Vec<ProviderInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderInfo {
    provider_id: String,
}

impl FederatedAuthClient {
    pub fn new(cfg: FederatedConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self {
            http,
            verify_url: cfg.verify_url,
            lookup_url: cfg.lookup_url,
            audience: cfg.audience,
            api_key: cfg.api_key,
            clock,
        })
    }

    /// Posts `body` and decodes a 2xx reply. A 4xx reply about the request
    /// itself becomes `rejected`; anything else is a provider failure.
    async fn post_json<B, R>(&self, url: &str, body: &B, rejected: AuthError) -> Result<R, AuthError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .header("x-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(%url, error = %e, "identity provider unreachable");
                AuthError::IdentityProvider(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_failure(url, status, rejected));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AuthError::IdentityProvider(format!("malformed response: {e}")))
    }
}

/// Maps a non-2xx provider status. Throttling and a refused API key are
/// provider failures, not a bad credential.
fn classify_failure(url: &str, status: StatusCode, rejected: AuthError) -> AuthError {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            warn!(%url, %status, "identity provider throttled or timed out");
            AuthError::IdentityProvider(format!("provider returned {status}"))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            warn!(%url, %status, "identity provider refused our api key");
            AuthError::IdentityProvider(format!("provider returned {status}"))
        }
        s if s.is_client_error() => {
            debug!(%url, %status, "identity provider rejected request");
            rejected
        }
        _ => {
            warn!(%url, %status, "identity provider failed");
            AuthError::IdentityProvider(format!("unexpected status {status}"))
        }
    }
}

#[async_trait::async_trait]
impl AuthClient for FederatedAuthClient {
    async fn verify(&self, raw_token: &str) -> Result<Claims, AuthError> {
        let token = strip_bearer(raw_token);
        if token.is_empty() {
            return Err(AuthError::InvalidCredential);
        }

        let verified: VerifyResponse = self
            .post_json(
                &self.verify_url,
                &VerifyRequest { id_token: token },
                AuthError::InvalidCredential,
            )
            .await?;

        if verified.sub.is_empty() || verified.aud != self.audience {
            debug!(aud = %verified.aud, "federated token for another audience");
            return Err(AuthError::InvalidCredential);
        }
        let issued_at =
            DateTime::from_timestamp(verified.iat, 0).ok_or(AuthError::InvalidCredential)?;
        let expires_at =
            DateTime::from_timestamp(verified.exp, 0).ok_or(AuthError::InvalidCredential)?;

        let now = self.clock.now();
        if issued_at > now + ChronoDuration::seconds(ALLOWED_SKEW_SECS) || now >= expires_at {
            return Err(AuthError::InvalidCredential);
        }

        Ok(Claims {
            subject: verified.sub,
            token_type: TokenType::Access,
            issued_at,
            expires_at,
            nonce: None,
        })
    }
}

#[async_trait::async_trait]
impl ProfileSource for FederatedAuthClient {
    async fn lookup(&self, subject: &str) -> Result<FederatedProfile, AuthError> {
        let rejected = AuthError::IdentityProvider("profile lookup rejected".to_string());
        let found: LookupResponse = self
            .post_json(&self.lookup_url, &LookupRequest { local_id: [subject] }, rejected)
            .await?;

        let user = found
            .users
            .into_iter()
            .find(|u| u.local_id == subject)
            .ok_or(AuthError::NotFound)?;
        let provider_id = user
            .provider_user_info
            .into_iter()
            .next()
            .map(|p| p.provider_id)
            .unwrap_or_else(|| ANONYMOUS_PROVIDER_ID.to_string());

        Ok(FederatedProfile {
            subject: user.local_id,
            email: user.email,
            display_name: user.display_name,
            provider_id,
        })
    }
}
