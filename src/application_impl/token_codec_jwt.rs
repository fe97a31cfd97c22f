use crate::application_port::{AuthError, TokenCodec};
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub access_secret: SecretString,
    /// Must differ from `access_secret` so one token class cannot forge the other.
    pub refresh_secret: SecretString,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    typ: TokenType,
    iat: i64,
    exp: i64,
    iss: String,
    aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        KeyPair {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }
}

pub struct JwtTokenCodec {
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    access_keys: KeyPair,
    refresh_keys: KeyPair,
}

impl JwtTokenCodec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtTokenCodec {
            access_keys: KeyPair::from_secret(&cfg.access_secret),
            refresh_keys: KeyPair::from_secret(&cfg.refresh_secret),
            issuer: cfg.issuer,
            audience: cfg.audience,
            access_ttl: cfg.access_ttl,
            refresh_ttl: cfg.refresh_ttl,
        }
    }

    #[inline]
    fn gen_nonce() -> String {
        nanoid::nanoid!(32)
    }

    fn keys(&self, token_type: TokenType) -> &KeyPair {
        match token_type {
            TokenType::Access => &self.access_keys,
            TokenType::Refresh => &self.refresh_keys,
        }
    }

    fn encode_claims(
        &self,
        user: UserId,
        token_type: TokenType,
        ttl: Duration,
        nonce: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let ttl_secs =
            i64::try_from(ttl.as_secs()).map_err(|e| AuthError::InternalError(e.to_string()))?;
        let iat = now.timestamp();
        let exp = iat
            .checked_add(ttl_secs)
            .ok_or_else(|| AuthError::InternalError("token expiry overflow".to_string()))?;
        let exp_dt = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| AuthError::InternalError("token expiry out of range".to_string()))?;

        let claims = WireClaims {
            sub: user.to_string(),
            typ: token_type,
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            nonce,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys(token_type).encoding,
        )
        .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok((token, exp_dt))
    }

    fn decode_claims(
        &self,
        raw: &str,
        expected: TokenType,
    ) -> Result<Claims, AuthError> {
        let mut v = Validation::new(Algorithm::HS256);
        v.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // expiry is checked against the caller's clock in `parse`
        v.validate_exp = false;
        v.set_audience(&[self.audience.as_str()]);
        v.set_issuer(&[self.issuer.as_str()]);
        v.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        let data = decode::<WireClaims>(raw, &self.keys(expected).decoding, &v).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => debug!(%expected, "token signature mismatch"),
                kind => debug!(%expected, ?kind, "token rejected"),
            }
            AuthError::InvalidToken
        })?;
        let wire = data.claims;

        if wire.typ != expected || wire.sub.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        if expected == TokenType::Refresh && wire.nonce.is_none() {
            return Err(AuthError::InvalidToken);
        }

        let issued_at = DateTime::from_timestamp(wire.iat, 0).ok_or(AuthError::InvalidToken)?;
        let expires_at = DateTime::from_timestamp(wire.exp, 0).ok_or(AuthError::InvalidToken)?;
        Ok(Claims {
            subject: wire.sub,
            token_type: wire.typ,
            issued_at,
            expires_at,
            nonce: wire.nonce,
        })
    }
}

impl TokenCodec for JwtTokenCodec {
    fn mint_access(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) =
            self.encode_claims(user, TokenType::Access, self.access_ttl, None, now)?;
        Ok((AccessToken(token), exp_dt))
    }

    fn mint_refresh(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError> {
        let nonce = Some(Self::gen_nonce());
        let (token, exp_dt) =
            self.encode_claims(user, TokenType::Refresh, self.refresh_ttl, nonce, now)?;
        Ok((RefreshToken(token), exp_dt))
    }

    fn parse(
        &self,
        raw: &str,
        expected: TokenType,
        now: DateTime<Utc>,
    ) -> Result<Claims, AuthError> {
        let claims = self.decode_claims(raw, expected)?;
        if !claims.is_live_at(now) {
            debug!(%expected, expires_at = %claims.expires_at, "token outside validity window");
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    fn parse_allow_expired(&self, raw: &str, expected: TokenType) -> Result<Claims, AuthError> {
        self.decode_claims(raw, expected)
    }
}

#[cfg(test)]
pub(crate) fn test_codec(access_ttl: Duration, refresh_ttl: Duration) -> JwtTokenCodec {
    JwtTokenCodec::new(JwtConfig {
        issuer: "cadence.test".to_string(),
        audience: "cadence-client".to_string(),
        access_ttl,
        refresh_ttl,
        access_secret: SecretString::from("access-secret-for-tests".to_string()),
        refresh_secret: SecretString::from("refresh-secret-for-tests".to_string()),
    })
}
