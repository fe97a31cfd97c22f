use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;
use tracing::{info, warn};

pub struct RealSessionService {
    auth_client: Arc<dyn AuthClient>,
    profile_source: Arc<dyn ProfileSource>,
    user_repo: Arc<dyn UserRepo>,
    token_service: Arc<dyn TokenService>,
    clock: Arc<dyn Clock>,
}

impl RealSessionService {
    pub fn new(
        auth_client: Arc<dyn AuthClient>,
        profile_source: Arc<dyn ProfileSource>,
        user_repo: Arc<dyn UserRepo>,
        token_service: Arc<dyn TokenService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            auth_client,
            profile_source,
            user_repo,
            token_service,
            clock,
        }
    }

    async fn find_or_create_user(&self, federated_id: &str) -> Result<User, AuthError> {
        if let Some(user) = self.user_repo.find_by_federated_id(federated_id).await? {
            return Ok(user);
        }

        let profile = self.profile_source.lookup(federated_id).await?;
        let identity_provider = IdentityProvider::from_provider_id(&profile.provider_id)
            .ok_or_else(|| {
                warn!(%federated_id, provider_id = %profile.provider_id, "unsupported identity provider");
                AuthError::InvalidCredential
            })?;

        let user = User {
            id: UserId::new_v4(),
            federated_id: federated_id.to_string(),
            email: profile.email,
            display_name: profile.display_name,
            identity_provider,
            created_at: self.clock.now(),
        };

        match self.user_repo.create(user).await {
            Ok(user) => {
                info!(user_id = %user.id, %federated_id, provider = %user.identity_provider, "user created from federated login");
                Ok(user)
            }
            // a concurrent login for the same subject got there first
            Err(AuthError::UserExists) => self
                .user_repo
                .find_by_federated_id(federated_id)
                .await?
                .ok_or(AuthError::NotFound),
            Err(e) => Err(e),
        }
    }
}

#[async_trait::async_trait]
impl SessionService for RealSessionService {
    async fn verify_federated_login(
        &self,
        federated_token: &str,
    ) -> Result<LoginResult, AuthError> {
        let claims = self.auth_client.verify(federated_token).await?;
        let user = self.find_or_create_user(&claims.subject).await?;
        let tokens = self.token_service.mint(user.id).await?;
        Ok(LoginResult { user, tokens })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.token_service.refresh(refresh_token).await
    }

    async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.token_service.revoke(refresh_token).await
    }

    async fn issue_test_token(&self, user_id: UserId) -> Result<TokenPair, AuthError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;
        warn!(user_id = %user.id, "issuing test token without federated verification");
        self.token_service.mint(user.id).await
    }
}
