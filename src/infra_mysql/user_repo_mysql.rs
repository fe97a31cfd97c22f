use super::util::is_dup_key;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: UserId,
    federated_id: String,
    email: Option<String>,
    display_name: Option<String>,
    identity_provider: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AuthError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let identity_provider = row
            .identity_provider
            .parse::<IdentityProvider>()
            .map_err(AuthError::Store)?;
        Ok(User {
            id: row.user_id,
            federated_id: row.federated_id,
            email: row.email,
            display_name: row.display_name,
            identity_provider,
            created_at: row.created_at,
        })
    }
}

const SELECT_USER: &str = r#"
SELECT user_id, federated_id, email, display_name, identity_provider, created_at
FROM user
"#;

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn find_by_federated_id(&self, federated_id: &str) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE federated_id = ?"))
            .bind(federated_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(format!("query user by federated_id: {e}")))?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE user_id = ?"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(format!("query user by id: {e}")))?;

        row.map(User::try_from).transpose()
    }

    async fn create(&self, user: User) -> Result<User, AuthError> {
        let result = sqlx::query(
            r#"
INSERT INTO user (user_id, federated_id, email, display_name, identity_provider, created_at)
VALUES (?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(user.id)
        .bind(&user.federated_id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.identity_provider.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(e) if is_dup_key(&e) => Err(AuthError::UserExists),
            Err(e) => Err(AuthError::Store(e.to_string())),
        }
    }
}
