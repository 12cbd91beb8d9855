use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::instrument;

use crate::{
    auth::{
        claims::IdentityClaims,
        dto::{AuthResponse, LoginRequest, RegisterRequest},
        extractors::{AuthUser, JsonBody},
        services::AuthError,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    state.identity.register(payload).await.map(Json)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    state.identity.login(payload).await.map(Json)
}

pub async fn get_me(AuthUser(claims): AuthUser) -> Json<IdentityClaims> {
    Json(claims)
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // internal failures get a fixed message; details are already logged
        let message = match &self {
            AuthError::MalformedHeader | AuthError::InvalidToken => "unauthorized".to_string(),
            AuthError::Hashing(_) | AuthError::Storage(_) | AuthError::TokenIssue(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}
