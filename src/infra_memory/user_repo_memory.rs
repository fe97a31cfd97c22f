use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;

#[derive(Default)]
pub struct InMemoryUserRepo {
    users: DashMap<UserId, User>,
    by_federated_id: DashMap<String, UserId>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait::async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn find_by_federated_id(&self, federated_id: &str) -> Result<Option<User>, AuthError> {
        let user_id = self.by_federated_id.get(federated_id).map(|id| *id);
        Ok(user_id.and_then(|id| self.users.get(&id).map(|u| u.clone())))
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, AuthError> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn create(&self, user: User) -> Result<User, AuthError> {
        // the index entry decides which concurrent create wins; only the
        // winner's row is ever stored
        let mut won = false;
        let _ = self
            .by_federated_id
            .entry(user.federated_id.clone())
            .or_insert_with(|| {
                self.users.insert(user.id, user.clone());
                won = true;
                user.id
            });
        if !won {
            return Err(AuthError::UserExists);
        }
        Ok(user)
    }
}
