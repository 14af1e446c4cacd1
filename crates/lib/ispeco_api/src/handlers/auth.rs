//! Authentication request handlers.

use axum::extract::State;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{LoginRequest, LogoutRequest, LogoutResponse, RefreshRequest, RegisterRequest, TokenResponse};
use crate::services::auth;

/// `POST /auth/register`: create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::register(&state.pool, &body, state.config.jwt_secret.as_bytes()).await?;
    Ok(Json(resp))
}

/// `POST /auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login(
        &state.pool,
        &body.email,
        &body.password,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /auth/refresh`: exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::refresh(
        &state.pool,
        &body.refresh_token,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /auth/logout`: revoke a refresh token.
pub async fn logout_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<LogoutRequest>,
) -> AppResult<Json<LogoutResponse>> {
    let resp = auth::logout(&state.pool, body.refresh_token.as_deref()).await?;
    Ok(Json(resp))
}

/// `POST /auth/logout-all`: revoke every refresh token of the caller.
pub async fn logout_all_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<LogoutResponse>> {
    let resp = auth::logout_all(&state.pool, user.user_id()?).await?;
    Ok(Json(resp))
}
