//! Runs a full session lifecycle against in-memory adapters.
//!
//! $ cargo run --bin session_demo

use cadence::application_impl::*;
use cadence::application_port::*;
use cadence::domain_model::*;
use cadence::domain_port::*;
use cadence::infra_memory::*;
use cadence::logger::*;
use chrono::Duration as ChronoDuration;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

/// Accepts `demo:<subject>` as a federated token.
struct DemoIdentity {
    clock: Arc<dyn Clock>,
}

#[async_trait::async_trait]
impl AuthClient for DemoIdentity {
    async fn verify(&self, raw_token: &str) -> Result<Claims, AuthError> {
        let subject = strip_bearer(raw_token)
            .strip_prefix("demo:")
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::InvalidCredential)?;
        let now = self.clock.now();
        Ok(Claims {
            subject: subject.to_string(),
            token_type: TokenType::Access,
            issued_at: now,
            expires_at: now + ChronoDuration::hours(1),
            nonce: None,
        })
    }
}

#[async_trait::async_trait]
impl ProfileSource for DemoIdentity {
    async fn lookup(&self, subject: &str) -> Result<FederatedProfile, AuthError> {
        Ok(FederatedProfile {
            subject: subject.to_string(),
            email: Some(format!("{subject}@example.com")),
            display_name: Some(subject.to_string()),
            provider_id: "google.com".to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _logger = Logger::new_bootstrap();

    let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
    let codec: Arc<dyn TokenCodec> = Arc::new(JwtTokenCodec::new(JwtConfig {
        issuer: "cadence.demo".to_string(),
        audience: "cadence-demo".to_string(),
        access_ttl: Duration::from_secs(60),
        refresh_ttl: Duration::from_secs(300),
        access_secret: SecretString::from("demo-access-secret".to_string()),
        refresh_secret: SecretString::from("demo-refresh-secret".to_string()),
    }));
    let revocations = Arc::new(InMemoryRevocationStore::new(clock.clone()));
    let identity = Arc::new(DemoIdentity {
        clock: clock.clone(),
    });
    let token_service = Arc::new(RealTokenService::new(
        codec,
        revocations.clone(),
        clock.clone(),
    ));
    let sessions = RealSessionService::new(
        identity.clone(),
        identity,
        Arc::new(InMemoryUserRepo::new()),
        token_service,
        clock.clone(),
    );

    let login = sessions.verify_federated_login("demo:ada").await?;
    info!(user_id = %login.user.id, provider = %login.user.identity_provider, "logged in");

    let refreshed = sessions.refresh(&login.tokens.refresh_token.0).await?;
    info!(live_records = revocations.len(), "refreshed once");

    sessions.revoke(&login.tokens.refresh_token.0).await?;
    let after_revoke = sessions.refresh(&login.tokens.refresh_token.0).await;
    info!(?after_revoke, "refresh after revoke");

    clock.advance(ChronoDuration::seconds(301));
    let after_expiry = sessions.refresh(&refreshed.refresh_token.0).await;
    info!(?after_expiry, "refresh after expiry");

    Ok(())
}
