use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    pub fn new_v4() -> Self {
        UserId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(UserId)
    }
}

/// Sign-in method the federation provider reports for a subject.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityProvider {
    Google,
    Apple,
    Password,
}

impl IdentityProvider {
    /// Maps the provider's sub-identifier (`google.com`, `apple.com`, `password`).
    pub fn from_provider_id(provider_id: &str) -> Option<Self> {
        match provider_id {
            "google.com" => Some(IdentityProvider::Google),
            "apple.com" => Some(IdentityProvider::Apple),
            "password" => Some(IdentityProvider::Password),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityProvider::Google => "google",
            IdentityProvider::Apple => "apple",
            IdentityProvider::Password => "password",
        }
    }
}

impl fmt::Display for IdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IdentityProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(IdentityProvider::Google),
            "apple" => Ok(IdentityProvider::Apple),
            "password" => Ok(IdentityProvider::Password),
            other => Err(format!("unknown identity provider: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub federated_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub identity_provider: IdentityProvider,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_map_onto_local_enum() {
        assert_eq!(
            IdentityProvider::from_provider_id("google.com"),
            Some(IdentityProvider::Google)
        );
        assert_eq!(
            IdentityProvider::from_provider_id("apple.com"),
            Some(IdentityProvider::Apple)
        );
        assert_eq!(
            IdentityProvider::from_provider_id("password"),
            Some(IdentityProvider::Password)
        );
        assert_eq!(IdentityProvider::from_provider_id("github.com"), None);
    }

    #[test]
    fn provider_storage_name_round_trips() {
        for provider in [
            IdentityProvider::Google,
            IdentityProvider::Apple,
            IdentityProvider::Password,
        ] {
            assert_eq!(provider.as_str().parse::<IdentityProvider>(), Ok(provider));
        }
    }
}
