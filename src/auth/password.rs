use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

use crate::config::HashConfig;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Salted Argon2id hashing with a configurable work factor.
///
/// Verification reads the parameters embedded in the stored hash, so
/// changing the cost only affects newly created hashes.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    // hashed with the configured cost at startup
    dummy_hash: String,
}

impl CredentialHasher {
    pub fn new(cfg: &HashConfig) -> Result<Self, HashError> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| HashError::Hashing(e.to_string()))?;
        let mut hasher = Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash_password("no-such-account")?;
        Ok(hasher)
    }

    pub fn hash_password(&self, plain: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                HashError::Hashing(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// `Ok(false)` on a plain mismatch; `Err` only when `hash` itself is unusable.
    pub fn verify_password(&self, plain: &str, hash: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            HashError::MalformedHash(e.to_string())
        })?;
        match self.argon2.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "argon2 verify_password error");
                Err(HashError::MalformedHash(e.to_string()))
            }
        }
    }

    /// Spends the same work as a real verification and discards the result.
    /// Used when there is no stored hash to check against.
    pub fn verify_dummy(&self, plain: &str) {
        let _ = self.verify_password(plain, &self.dummy_hash);
    }
}
