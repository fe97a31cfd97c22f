use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub struct RedisRevocationStore {
    conn: ConnectionManager,
    prefix: String,
    op_timeout: Duration,
}

impl RedisRevocationStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, op_timeout: Duration) -> Self {
        RedisRevocationStore {
            conn,
            prefix: prefix.into(),
            op_timeout,
        }
    }

    fn key(&self, user_id: UserId, refresh_token: &RefreshToken) -> String {
        revocation_key(&self.prefix, user_id, refresh_token)
    }
}

/// Runs one redis command under `op_timeout`; failures and timeouts become `Store`.
async fn bounded<T>(
    op_timeout: Duration,
    op: &'static str,
    fut: impl Future<Output = RedisResult<T>>,
) -> Result<T, AuthError> {
    match tokio::time::timeout(op_timeout, fut).await {
        Ok(result) => result.map_err(|e| {
            warn!(op, error = %e, "redis command failed");
            AuthError::Store(e.to_string())
        }),
        Err(_) => {
            warn!(op, timeout_ms = op_timeout.as_millis() as u64, "redis command timed out");
            Err(AuthError::Store(format!("{op} timed out")))
        }
    }
}

/// Rounded down so the record never outlives the token.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait::async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn mark_live(
        &self,
        user_id: UserId,
        refresh_token: &RefreshToken,
        ttl: Duration,
    ) -> Result<(), AuthError> {
        let millis = ttl_millis(ttl);
        if millis == 0 {
            return Ok(());
        }
        let key = self.key(user_id, refresh_token);
        let mut conn = self.conn.clone();
        bounded(self.op_timeout, "PSETEX", async move {
            conn.pset_ex(&key, 1, millis).await
        })
        .await
    }

    async fn is_live(
        &self,
        user_id: UserId,
        refresh_token: &RefreshToken,
    ) -> Result<bool, AuthError> {
        let key = self.key(user_id, refresh_token);
        let mut conn = self.conn.clone();
        bounded(self.op_timeout, "EXISTS", async move { conn.exists(&key).await }).await
    }

    async fn revoke(&self, user_id: UserId, refresh_token: &RefreshToken) -> Result<(), AuthError> {
        let key = self.key(user_id, refresh_token);
        let mut conn = self.conn.clone();
        bounded(self.op_timeout, "DEL", async move { conn.del(&key).await }).await
    }
}
