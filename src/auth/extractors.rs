use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use tracing::warn;

use super::{claims::IdentityClaims, services::AuthError};
use crate::state::AppState;

/// Validates the bearer token and hands the decoded claims to the handler.
pub struct AuthUser(pub IdentityClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // A missing header is treated like one with the wrong scheme
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();

        state.identity.validate_bearer(header).map(AuthUser)
    }
}

/// `Json<T>` whose rejections come back as `400 {"error":"invalid request"}`.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                warn!(status = %rejection.status(), reason = %rejection.body_text(), "request body rejected");
                Err(AuthError::InvalidRequest)
            }
        }
    }
}
