use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_federated_id(&self, federated_id: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, AuthError>;

    /// Fails with [`AuthError::UserExists`] when the federated id is taken.
    async fn create(&self, user: User) -> Result<User, AuthError>;
}
