//! Authentication endpoints
//!
//! Sign-up, login, logout, and password reset. Sign-up is two-phase; when
//! the profile write fails after the identity is created, the response
//! carries `account_created: true` so the client can tell the outcomes
//! apart.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::identity::{AuthError, NewProfile, SignUpError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub profile: NewProfile,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

fn auth_error_response(e: &AuthError) -> Response {
    let status = match e {
        AuthError::InvalidCredential => StatusCode::UNAUTHORIZED,
        AuthError::EmailInUse => StatusCode::CONFLICT,
        AuthError::WeakPassword => StatusCode::BAD_REQUEST,
        AuthError::UserNotFound(_) => StatusCode::NOT_FOUND,
        AuthError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Response {
    match state
        .identity
        .sign_up(&request.email, &request.password, request.profile)
        .await
    {
        Ok(principal) => {
            info!(user_id = %principal.id, "Sign-up complete");
            (
                StatusCode::CREATED,
                Json(json!({ "user_id": principal.id, "email": principal.email })),
            )
                .into_response()
        }
        Err(SignUpError::Auth(e)) => auth_error_response(&e),
        // The account exists; only the profile write failed
        Err(e @ SignUpError::ProfileWrite(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string(), "account_created": true })),
        )
            .into_response(),
    }
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Response {
    match state.identity.sign_in(&request.email, &request.password).await {
        Ok(principal) => {
            info!(user_id = %principal.id, "Login complete");
            Json(json!({ "user_id": principal.id, "email": principal.email })).into_response()
        }
        Err(e) => auth_error_response(&e),
    }
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>) -> Response {
    match state.identity.sign_out().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => auth_error_response(&e),
    }
}

/// POST /api/auth/reset
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Response {
    match state.identity.reset_password(&request.email).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({ "message": "Password reset email sent" })),
        )
            .into_response(),
        Err(e) => auth_error_response(&e),
    }
}

/// Build authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/reset", post(reset_password))
}
