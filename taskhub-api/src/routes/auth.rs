/// Token endpoints
///
/// Exchange credentials for a bearer token pair, and a refresh token for a
/// new access token. Tokens carry the user id only; the role is read from the
/// store on every request.
///
/// # Endpoints
///
/// - `POST /v1/auth/token` - Credentials to access + refresh tokens
/// - `POST /v1/auth/token/refresh` - Refresh token to a new access token

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiResult},
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use taskhub_shared::auth::{jwt, password};

/// Token request
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access: String,
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("No active account found with the given credentials".to_string())
}

/// Obtain a token pair
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/token
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "access": "eyJ...",
///   "refresh": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown username or wrong password (same message)
pub async fn obtain_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TokenRequest>,
) -> ApiResult<Json<jwt::TokenPair>> {
    let Some(user) = state.store.find_user_by_username(&req.username).await? else {
        password::verify_without_account(&req.password, &state.config.password_hash)?;
        tracing::debug!("Rejected token request: unknown username");
        return Err(invalid_credentials());
    };

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Rejected token request: wrong password");
        return Err(invalid_credentials());
    }

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "Issued token pair");

    Ok(Json(tokens))
}

/// Refresh an access token
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/token/refresh
/// Content-Type: application/json
///
/// { "refresh": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or deleted account
pub async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let (user_id, access) = jwt::refresh_access_token(&req.refresh, state.jwt_secret())?;

    if state.store.get_user(user_id).await?.is_none() {
        return Err(ApiError::Unauthorized("User not found".to_string()));
    }

    tracing::debug!(user_id = %user_id, "Refreshed access token");

    Ok(Json(RefreshResponse { access }))
}
