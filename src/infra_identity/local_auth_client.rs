use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::Clock;
use std::sync::Arc;

/// Verifies the service's own HMAC-signed access tokens. No network I/O.
pub struct LocalAuthClient {
    codec: Arc<dyn TokenCodec>,
    clock: Arc<dyn Clock>,
}

impl LocalAuthClient {
    pub fn new(codec: Arc<dyn TokenCodec>, clock: Arc<dyn Clock>) -> Self {
        LocalAuthClient { codec, clock }
    }
}

#[async_trait::async_trait]
impl AuthClient for LocalAuthClient {
    async fn verify(&self, raw_token: &str) -> Result<Claims, AuthError> {
        let token = strip_bearer(raw_token);
        if token.is_empty() {
            return Err(AuthError::InvalidCredential);
        }
        self.codec
            .parse(token, TokenType::Access, self.clock.now())
            .map_err(|e| match e {
                AuthError::InvalidToken => AuthError::InvalidCredential,
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::test_codec;
    use crate::infra_memory::ManualClock;
    use chrono::{DateTime, Utc};
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use std::time::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn client() -> (LocalAuthClient, Arc<dyn TokenCodec>) {
        let codec: Arc<dyn TokenCodec> = Arc::new(test_codec(
            Duration::from_secs(60),
            Duration::from_secs(3600),
        ));
        let clock = Arc::new(ManualClock::new(now()));
        (LocalAuthClient::new(codec.clone(), clock), codec)
    }

    fn hand_signed(alg: Algorithm, user: UserId) -> String {
        let claims = serde_json::json!({
            "sub": user.to_string(),
            "typ": "access",
            "iat": now().timestamp(),
            "exp": now().timestamp() + 60,
            "iss": "cadence.test",
            "aud": "cadence-client",
        });
        encode(
            &Header::new(alg),
            &claims,
            &EncodingKey::from_secret(b"access-secret-for-tests"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn accepts_own_access_token_with_bearer_prefix() {
        let (client, codec) = client();
        let user = UserId::new_v4();
        let (token, _) = codec.mint_access(user, now()).unwrap();

        let claims = client.verify(&format!("Bearer {}", token.0)).await.unwrap();
        assert_eq!(claims.subject, user.to_string());
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[tokio::test]
    async fn accepts_other_hmac_family_members() {
        let (client, _) = client();
        let user = UserId::new_v4();

        for alg in [Algorithm::HS384, Algorithm::HS512] {
            let claims = client.verify(&hand_signed(alg, user)).await.unwrap();
            assert_eq!(claims.subject, user.to_string());
        }
    }

    #[tokio::test]
    async fn rejects_non_hmac_header() {
        let (client, _) = client();
        let token = hand_signed(Algorithm::HS256, UserId::new_v4());
        let (_, rest) = token.split_once('.').unwrap();
        // {"alg":"RS256","typ":"JWT"}
        let confused = format!("eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.{rest}");

        assert_eq!(
            client.verify(&confused).await,
            Err(AuthError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn rejects_refresh_tokens_and_empty_input() {
        let (client, codec) = client();
        let (refresh, _) = codec.mint_refresh(UserId::new_v4(), now()).unwrap();

        assert_eq!(
            client.verify(&refresh.0).await,
            Err(AuthError::InvalidCredential)
        );
        assert_eq!(client.verify("Bearer ").await, Err(AuthError::InvalidCredential));
    }
}
