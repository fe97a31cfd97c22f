use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Expired records are swept once per this many writes.
const PRUNE_EVERY: usize = 1024;

pub struct InMemoryRevocationStore {
    records: DashMap<String, DateTime<Utc>>,
    clock: Arc<dyn Clock>,
    prefix: String,
    writes: AtomicUsize,
}

impl InMemoryRevocationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        InMemoryRevocationStore {
            records: DashMap::new(),
            clock,
            prefix: DEFAULT_REVOCATION_PREFIX.to_string(),
            writes: AtomicUsize::new(0),
        }
    }

    /// Drops every record whose deadline has passed.
    pub fn prune_expired(&self) {
        let now = self.clock.now();
        self.records.retain(|_, deadline| *deadline > now);
    }

    fn key(&self, user_id: UserId, refresh_token: &RefreshToken) -> String {
        revocation_key(&self.prefix, user_id, refresh_token)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn mark_live(
        &self,
        user_id: UserId,
        refresh_token: &RefreshToken,
        ttl: Duration,
    ) -> Result<(), AuthError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        let deadline = self.clock.now() + ttl;
        self.records.insert(self.key(user_id, refresh_token), deadline);

        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % PRUNE_EVERY == 0 {
            self.prune_expired();
        }
        Ok(())
    }

    async fn is_live(
        &self,
        user_id: UserId,
        refresh_token: &RefreshToken,
    ) -> Result<bool, AuthError> {
        let key = self.key(user_id, refresh_token);
        let deadline = self.records.get(&key).map(|d| *d);
        match deadline {
            Some(deadline) if self.clock.now() < deadline => Ok(true),
            Some(_) => {
                self.records.remove(&key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn revoke(&self, user_id: UserId, refresh_token: &RefreshToken) -> Result<(), AuthError> {
        self.records.remove(&self.key(user_id, refresh_token));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::ManualClock;

    fn token(s: &str) -> RefreshToken {
        RefreshToken(s.to_string())
    }

    #[tokio::test]
    async fn record_expires_with_ttl() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = InMemoryRevocationStore::new(clock.clone());
        let user = UserId::new_v4();

        store
            .mark_live(user, &token("t"), Duration::from_secs(30))
            .await
            .unwrap();
        assert!(store.is_live(user, &token("t")).await.unwrap());

        clock.advance(chrono::Duration::seconds(30));
        assert!(!store.is_live(user, &token("t")).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unread_expired_records_are_swept_on_write() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = InMemoryRevocationStore::new(clock.clone());
        let user = UserId::new_v4();

        for i in 0..PRUNE_EVERY - 1 {
            store
                .mark_live(user, &token(&format!("old-{i}")), Duration::from_secs(10))
                .await
                .unwrap();
        }
        assert_eq!(store.len(), PRUNE_EVERY - 1);

        clock.advance(chrono::Duration::seconds(10));
        store
            .mark_live(user, &token("fresh"), Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.is_live(user, &token("fresh")).await.unwrap());
    }

    #[tokio::test]
    async fn revoke_is_idempotent_and_scoped_to_user() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = InMemoryRevocationStore::new(clock);
        let (a, b) = (UserId::new_v4(), UserId::new_v4());
        let ttl = Duration::from_secs(60);

        store.mark_live(a, &token("same"), ttl).await.unwrap();
        store.mark_live(b, &token("same"), ttl).await.unwrap();

        store.revoke(a, &token("same")).await.unwrap();
        store.revoke(a, &token("same")).await.unwrap();

        assert!(!store.is_live(a, &token("same")).await.unwrap());
        assert!(store.is_live(b, &token("same")).await.unwrap());
    }
}
