use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_identity::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use secrecy::SecretString;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub session_service: Arc<dyn SessionService>,
    /// Verifies bearer access tokens on authenticated routes.
    pub access_verifier: Arc<dyn AuthClient>,
    pub enable_test_tokens: bool,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let token = &settings.token;
        let codec: Arc<dyn TokenCodec> = Arc::new(JwtTokenCodec::new(JwtConfig {
            issuer: token.issuer.clone(),
            audience: token.audience.clone(),
            access_ttl: Duration::from_secs(token.access_ttl_secs),
            refresh_ttl: Duration::from_secs(token.refresh_ttl_secs),
            access_secret: SecretString::from(token.access_secret.clone()),
            refresh_secret: SecretString::from(token.refresh_secret.clone()),
        }));

        let revocation = &settings.revocation;
        let revocation_store: Arc<dyn RevocationStore> = match revocation.backend.as_str() {
            "memory" => Arc::new(InMemoryRevocationStore::new(clock.clone())),
            "redis" => {
                let dsn = revocation
                    .redis_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("revocation.redis_dsn is not set"))?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisRevocationStore::new(
                    redis_manager,
                    revocation.prefix.clone(),
                    Duration::from_millis(revocation.op_timeout_ms),
                ))
            }
            other => return Err(anyhow::anyhow!("Unknown revocation backend: {}", other)),
        };

        let mut pool = None;
        let user_repo: Arc<dyn UserRepo> = match settings.user.backend.as_str() {
            "memory" => Arc::new(InMemoryUserRepo::new()),
            "mysql" => {
                let dsn = settings
                    .user
                    .mysql_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("user.mysql_dsn is not set"))?;
                let mysql_pool = Pool::<MySql>::connect(dsn).await?;
                pool = Some(mysql_pool.clone());
                Arc::new(MySqlUserRepo::new(mysql_pool))
            }
            other => return Err(anyhow::anyhow!("Unknown user backend: {}", other)),
        };

        let identity = &settings.identity;
        let federated = Arc::new(FederatedAuthClient::new(
            FederatedConfig {
                verify_url: identity.verify_url.clone(),
                lookup_url: identity.lookup_url.clone(),
                audience: identity.audience.clone(),
                api_key: SecretString::from(identity.api_key.clone()),
                timeout: Duration::from_millis(identity.timeout_ms),
            },
            clock.clone(),
        )?);

        let token_service: Arc<dyn TokenService> = Arc::new(RealTokenService::new(
            codec.clone(),
            revocation_store,
            clock.clone(),
        ));
        let session_service: Arc<dyn SessionService> = Arc::new(RealSessionService::new(
            federated.clone(),
            federated,
            user_repo,
            token_service,
            clock.clone(),
        ));
        let access_verifier: Arc<dyn AuthClient> = Arc::new(LocalAuthClient::new(codec, clock));

        if settings.session.enable_test_tokens {
            warn!("test token issuance is enabled");
        }
        info!(
            revocation = %revocation.backend,
            user = %settings.user.backend,
            "server started"
        );

        Ok(Self {
            session_service,
            access_verifier,
            enable_test_tokens: settings.session.enable_test_tokens,
            pool,
        })
    }

    /// Assembles a server from already-built services, without any backing
    /// connections.
    pub fn from_parts(
        session_service: Arc<dyn SessionService>,
        access_verifier: Arc<dyn AuthClient>,
        enable_test_tokens: bool,
    ) -> Self {
        Self {
            session_service,
            access_verifier,
            enable_test_tokens,
            pool: None,
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
