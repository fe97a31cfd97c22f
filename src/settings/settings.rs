use anyhow::{Result, anyhow, bail};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub token: Token,
    pub revocation: Revocation,
    pub identity: Identity,
    pub user: User,
    #[serde(default)]
    pub session: Session,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Token {
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub access_secret: String,
    pub refresh_secret: String,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub struct Revocation {
    pub backend: String, // "redis" or "memory"
    pub redis_dsn: Option<String>,
    #[serde(default = "default_revocation_prefix")]
    pub prefix: String,
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

#[derive(Deserialize)]
pub struct Identity {
    pub verify_url: String,
    pub lookup_url: String,
    pub audience: String,
    pub api_key: String,
    #[serde(default = "default_op_timeout_ms")]
    pub timeout_ms: u64,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("verify_url", &self.verify_url)
            .field("lookup_url", &self.lookup_url)
            .field("audience", &self.audience)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub backend: String, // "mysql" or "memory"
    pub mysql_dsn: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Session {
    /// Exposes the test-token route. Never enable in production.
    #[serde(default)]
    pub enable_test_tokens: bool,
}

fn default_revocation_prefix() -> String {
    crate::domain_port::DEFAULT_REVOCATION_PREFIX.to_string()
}

fn default_op_timeout_ms() -> u64 {
    2_000
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let token = &self.token;
        if token.access_secret.is_empty() || token.refresh_secret.is_empty() {
            bail!("token secrets must not be empty");
        }
        if token.access_secret == token.refresh_secret {
            bail!("token.access_secret and token.refresh_secret must differ");
        }
        if self.identity.api_key == token.access_secret
            || self.identity.api_key == token.refresh_secret
        {
            bail!("identity.api_key must differ from the token secrets");
        }
        if token.access_ttl_secs == 0 || token.refresh_ttl_secs == 0 {
            bail!("token TTLs must be positive");
        }

        match self.revocation.backend.as_str() {
            "redis" if self.revocation.redis_dsn.is_none() => {
                bail!("revocation.redis_dsn is required for the redis backend")
            }
            "redis" | "memory" => {}
            other => bail!("Unknown revocation backend: {}", other),
        }
        match self.user.backend.as_str() {
            "mysql" if self.user.mysql_dsn.is_none() => {
                bail!("user.mysql_dsn is required for the mysql backend")
            }
            "mysql" | "memory" => {}
            other => bail!("Unknown user backend: {}", other),
        }
        Ok(())
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix("CADENCE").separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"
[http]
address = "127.0.0.1:8443"

[log]
filter = "info,cadence=debug"

[token]
issuer = "cadence.auth"
audience = "cadence-client"
access_ttl_secs = 900
refresh_ttl_secs = 604800
access_secret = "dev-access-secret"
refresh_secret = "dev-refresh-secret"

[revocation]
backend = "memory"

[identity]
verify_url = "http://127.0.0.1:9099/v1/token:verify"
lookup_url = "http://127.0.0.1:9099/v1/accounts:lookup"
audience = "cadence-dev"
api_key = "dev-provider-key"

[user]
backend = "memory"
"#;

    fn write_settings(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_with_defaults() {
        let file = write_settings(VALID);
        let settings = parse_settings(file.path().to_str()).unwrap();

        assert_eq!(settings.token.access_ttl_secs, 900);
        assert_eq!(settings.revocation.prefix, "refresh_token");
        assert_eq!(settings.revocation.op_timeout_ms, 2_000);
        assert!(!settings.session.enable_test_tokens);
        assert!(settings.http.cert_path.is_none());
    }

    #[test]
    fn rejects_shared_token_secret() {
        let file = write_settings(
            &VALID.replace("dev-refresh-secret", "dev-access-secret"),
        );
        let err = parse_settings(file.path().to_str()).unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn rejects_redis_without_dsn() {
        let file = write_settings(&VALID.replace(
            "[revocation]\nbackend = \"memory\"",
            "[revocation]\nbackend = \"redis\"",
        ));
        assert!(parse_settings(file.path().to_str()).is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let file = write_settings(VALID);
        let settings = parse_settings(file.path().to_str()).unwrap();
        let printed = format!("{settings:?}");
        assert!(!printed.contains("dev-access-secret"));
        assert!(!printed.contains("dev-provider-key"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(parse_settings(Some("")).is_err());
    }
}
