use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Smallest TTL the key-value backends can represent.
const MIN_RECORD_TTL: Duration = Duration::from_millis(1);

pub struct RealTokenService {
    codec: Arc<dyn TokenCodec>,
    store: Arc<dyn RevocationStore>,
    clock: Arc<dyn Clock>,
}

impl RealTokenService {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        store: Arc<dyn RevocationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            codec,
            store,
            clock,
        }
    }

    fn remaining(until: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        (until - now).to_std().unwrap_or(Duration::ZERO)
    }

    #[inline]
    fn subject(claims: &Claims) -> Result<UserId, AuthError> {
        claims
            .subject
            .parse::<UserId>()
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[async_trait::async_trait]
impl TokenService for RealTokenService {
    async fn mint(&self, user_id: UserId) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();
        let (access_token, _) = self.codec.mint_access(user_id, now)?;
        let (refresh_token, refresh_exp) = self.codec.mint_refresh(user_id, now)?;

        // the record is written before the pair leaves this function
        let ttl = Self::remaining(refresh_exp, now);
        if ttl < MIN_RECORD_TTL {
            debug!(%user_id, "refresh token minted without remaining validity");
        } else {
            self.store.mark_live(user_id, &refresh_token, ttl).await?;
        }

        debug!(%user_id, refresh_expires_at = %refresh_exp, "token pair minted");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .codec
            .parse(refresh_token, TokenType::Refresh, self.clock.now())?;
        let user_id = Self::subject(&claims)?;

        let presented = RefreshToken(refresh_token.to_string());
        if !self.store.is_live(user_id, &presented).await? {
            debug!(%user_id, "refresh with revoked token");
            return Err(AuthError::Revoked);
        }

        // the presented token stays live until expiry or explicit revoke
        self.mint(user_id).await
    }

    async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        let claims = self
            .codec
            .parse_allow_expired(refresh_token, TokenType::Refresh)?;
        let user_id = Self::subject(&claims)?;

        self.store
            .revoke(user_id, &RefreshToken(refresh_token.to_string()))
            .await?;
        debug!(%user_id, "refresh token revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::token_codec_jwt::test_codec;
    use crate::infra_memory::{InMemoryRevocationStore, ManualClock};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MINUTE: Duration = Duration::from_secs(60);
    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<InMemoryRevocationStore>,
        codec: Arc<dyn TokenCodec>,
        service: RealTokenService,
    }

    fn fixture(refresh_ttl: Duration) -> Fixture {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let store = Arc::new(InMemoryRevocationStore::new(clock.clone()));
        let codec: Arc<dyn TokenCodec> = Arc::new(test_codec(MINUTE, refresh_ttl));
        let service = RealTokenService::new(codec.clone(), store.clone(), clock.clone());
        Fixture {
            clock,
            store,
            codec,
            service,
        }
    }

    #[tokio::test]
    async fn mint_then_refresh_yields_new_pair_for_same_subject() {
        let f = fixture(DAY);
        let user = UserId::new_v4();

        let first = f.service.mint(user).await.unwrap();
        let second = f.service.refresh(&first.refresh_token.0).await.unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        let claims = f
            .codec
            .parse(&second.access_token.0, TokenType::Access, f.clock.now())
            .unwrap();
        assert_eq!(claims.subject, user.to_string());
    }

    #[tokio::test]
    async fn refresh_does_not_rotate_presented_token() {
        let f = fixture(DAY);
        let pair = f.service.mint(UserId::new_v4()).await.unwrap();

        f.service.refresh(&pair.refresh_token.0).await.unwrap();
        assert!(f.service.refresh(&pair.refresh_token.0).await.is_ok());
    }

    #[tokio::test]
    async fn expired_refresh_fails_as_invalid_token() {
        let f = fixture(DAY);
        let pair = f.service.mint(UserId::new_v4()).await.unwrap();

        f.clock.advance(chrono::Duration::days(1));
        assert_eq!(
            f.service.refresh(&pair.refresh_token.0).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn zero_ttl_refresh_fails_and_leaves_no_record() {
        let f = fixture(Duration::ZERO);
        let pair = f.service.mint(UserId::new_v4()).await.unwrap();

        assert!(f.store.is_empty());
        assert_eq!(
            f.service.refresh(&pair.refresh_token.0).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn revoked_refresh_fails_as_revoked() {
        let f = fixture(DAY);
        let pair = f.service.mint(UserId::new_v4()).await.unwrap();

        f.service.revoke(&pair.refresh_token.0).await.unwrap();
        assert_eq!(
            f.service.refresh(&pair.refresh_token.0).await,
            Err(AuthError::Revoked)
        );
    }

    #[tokio::test]
    async fn revoke_twice_is_fine() {
        let f = fixture(DAY);
        let pair = f.service.mint(UserId::new_v4()).await.unwrap();

        f.service.revoke(&pair.refresh_token.0).await.unwrap();
        f.service.revoke(&pair.refresh_token.0).await.unwrap();
    }

    #[tokio::test]
    async fn revoke_tolerates_expired_token() {
        let f = fixture(DAY);
        let pair = f.service.mint(UserId::new_v4()).await.unwrap();

        f.clock.advance(chrono::Duration::days(2));
        assert_eq!(f.service.revoke(&pair.refresh_token.0).await, Ok(()));
    }

    #[tokio::test]
    async fn token_types_are_not_interchangeable() {
        let f = fixture(DAY);
        let pair = f.service.mint(UserId::new_v4()).await.unwrap();

        assert_eq!(
            f.service.refresh(&pair.access_token.0).await,
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            f.codec
                .parse(&pair.refresh_token.0, TokenType::Access, f.clock.now()),
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            f.service.revoke(&pair.access_token.0).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn revoking_one_user_leaves_another_live() {
        let f = fixture(DAY);
        let a = f.service.mint(UserId::new_v4()).await.unwrap();
        let b = f.service.mint(UserId::new_v4()).await.unwrap();

        f.service.revoke(&a.refresh_token.0).await.unwrap();

        assert_eq!(
            f.service.refresh(&a.refresh_token.0).await,
            Err(AuthError::Revoked)
        );
        assert!(f.service.refresh(&b.refresh_token.0).await.is_ok());
    }

    #[tokio::test]
    async fn record_ttl_matches_remaining_validity() {
        let f = fixture(DAY);
        let user = UserId::new_v4();
        let pair = f.service.mint(user).await.unwrap();

        f.clock.advance(chrono::Duration::days(1) - chrono::Duration::seconds(1));
        assert!(f.store.is_live(user, &pair.refresh_token).await.unwrap());
        f.clock.advance(chrono::Duration::seconds(1));
        assert!(!f.store.is_live(user, &pair.refresh_token).await.unwrap());
    }

    struct FailingStore {
        writes: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl RevocationStore for FailingStore {
        async fn mark_live(
            &self,
            _user_id: UserId,
            _refresh_token: &RefreshToken,
            _ttl: Duration,
        ) -> Result<(), AuthError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(AuthError::Store("connection reset".to_string()))
        }

        async fn is_live(
            &self,
            _user_id: UserId,
            _refresh_token: &RefreshToken,
        ) -> Result<bool, AuthError> {
            Err(AuthError::Store("connection reset".to_string()))
        }

        async fn revoke(
            &self,
            _user_id: UserId,
            _refresh_token: &RefreshToken,
        ) -> Result<(), AuthError> {
            Err(AuthError::Store("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn store_failure_fails_mint_and_is_not_revoked() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(FailingStore {
            writes: AtomicUsize::new(0),
        });
        let codec: Arc<dyn TokenCodec> = Arc::new(test_codec(MINUTE, DAY));
        let service = RealTokenService::new(codec.clone(), store.clone(), clock.clone());

        let err = service.mint(UserId::new_v4()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);

        let (refresh, _) = codec.mint_refresh(UserId::new_v4(), clock.now()).unwrap();
        let err = service.refresh(&refresh.0).await.unwrap_err();
        assert_eq!(err, AuthError::Store("connection reset".to_string()));
    }
}
