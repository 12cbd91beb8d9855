use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::auth::{
    claims::IdentityClaims,
    dto::{AuthResponse, LoginRequest, RegisterRequest},
    jwt::{TokenError, TokenService},
    password::{CredentialHasher, HashError},
    repo_types::User,
};
use crate::store::{EntityStore, StoreError};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid request")]
    InvalidRequest,
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("malformed authorization header")]
    MalformedHeader,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("password hashing failed")]
    Hashing(#[from] HashError),
    #[error("storage failure")]
    Storage(#[from] StoreError),
    #[error("token issuance failed")]
    TokenIssue(#[source] TokenError),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidRequest | AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateEmail => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::MalformedHeader | AuthError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Hashing(_) | AuthError::Storage(_) | AuthError::TokenIssue(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Registration, login and bearer-token validation.
pub struct IdentityService {
    users: Arc<dyn EntityStore<User>>,
    hasher: CredentialHasher,
    tokens: TokenService,
}

impl IdentityService {
    pub fn new(users: Arc<dyn EntityStore<User>>, hasher: CredentialHasher, tokens: TokenService) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    #[instrument(skip_all, fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AuthError> {
        validate_credentials_input(&req.email, &req.password)?;

        match self.users.get_by_field("email", req.email.as_str().into()).await {
            Ok(_) => {
                warn!("email already registered");
                return Err(AuthError::DuplicateEmail);
            }
            Err(StoreError::NotFound) => {}
            Err(e) => {
                error!(error = %e, "email lookup failed");
                return Err(e.into());
            }
        }

        let hash = self.hasher.hash_password(&req.password)?;
        let user = User::new(&req.email, &hash, req.first_name, req.last_name);

        // the store has the final word on uniqueness when registrations race
        let id = match self.users.create(user).await {
            Ok(id) => id,
            Err(StoreError::DuplicateKey { .. }) => {
                warn!("email already registered");
                return Err(AuthError::DuplicateEmail);
            }
            Err(e) => {
                error!(error = %e, "create user failed");
                return Err(e.into());
            }
        };

        let token = self.issue(id, &req.email)?;
        info!(user_id = id, "user registered");
        Ok(AuthResponse { token })
    }

    #[instrument(skip_all, fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AuthError> {
        validate_credentials_input(&req.email, &req.password)?;

        let user = match self.users.get_by_field("email", req.email.as_str().into()).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => {
                // same hashing cost as a wrong password
                self.hasher.verify_dummy(&req.password);
                warn!("login unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = %e, "email lookup failed");
                return Err(e.into());
            }
        };

        if !self.hasher.verify_password(&req.password, &user.password_hash)? {
            warn!(user_id = user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue(user.id, &user.email)?;
        info!(user_id = user.id, "user logged in");
        Ok(AuthResponse { token })
    }

    /// Checks an `Authorization` header value of the form `Bearer <token>`.
    pub fn validate_bearer(&self, header: &str) -> Result<IdentityClaims, AuthError> {
        let Some(token) = header.strip_prefix(BEARER_PREFIX) else {
            warn!("authorization header without bearer scheme");
            return Err(AuthError::MalformedHeader);
        };
        self.tokens.verify(token).map_err(|e| {
            if let TokenError::Invalid(reason) = &e {
                warn!(reason = ?reason.kind(), "token rejected");
            }
            AuthError::InvalidToken
        })
    }

    fn issue(&self, user_id: i64, email: &str) -> Result<String, AuthError> {
        self.tokens.issue(user_id, email).map_err(|e| {
            error!(error = ?e, user_id, "jwt sign failed");
            AuthError::TokenIssue(e)
        })
    }
}

fn validate_credentials_input(email: &str, password: &str) -> Result<(), AuthError> {
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::InvalidInput("email and password are required"));
    }
    Ok(())
}
