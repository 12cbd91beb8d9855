use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::IdentityClaims;
use crate::config::JwtConfig;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, expired or malformed. The source keeps the exact reason
    /// for logs; callers only ever see this one variant.
    #[error("invalid or expired token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("token lifetime out of range")]
    TtlOutOfRange,
}

/// Issues and verifies HS256 identity tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // strict expiry, no clock skew allowance
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn from_config(cfg: &JwtConfig) -> Result<Self, TokenError> {
        let seconds = cfg
            .ttl_hours
            .checked_mul(3600)
            .filter(|s| *s > 0)
            .ok_or(TokenError::TtlOutOfRange)?;
        Ok(Self::new(&cfg.secret, Duration::seconds(seconds)))
    }

    pub fn issue(&self, subject: i64, email: &str) -> Result<String, TokenError> {
        self.issue_at(subject, email, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, subject: i64, email: &str, now: OffsetDateTime) -> Result<String, TokenError> {
        let expires = now.checked_add(self.ttl).ok_or(TokenError::TtlOutOfRange)?;
        let claims = IdentityClaims {
            subject,
            email: email.to_string(),
            issued_at: now.unix_timestamp(),
            expires_at: expires.unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;
        debug!(user_id = subject, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<IdentityClaims, TokenError> {
        let data =
            decode::<IdentityClaims>(token, &self.decoding, &self.validation).map_err(TokenError::Invalid)?;
        debug!(user_id = data.claims.subject, "jwt verified");
        Ok(data.claims)
    }
}
