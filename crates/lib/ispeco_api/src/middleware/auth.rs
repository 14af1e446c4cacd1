//! Authentication middleware: Bearer token extraction and JWT verification.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use ispeco_core::auth::jwt::verify_access_token;
use ispeco_core::models::auth::TokenClaims;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};

/// Key used to store `TokenClaims` in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub TokenClaims);

impl AuthenticatedUser {
    /// The authenticated principal's id.
    pub fn user_id(&self) -> AppResult<Uuid> {
        self.0
            .user_id()
            .ok_or_else(|| AppError::Unauthorized("Invalid token subject".into()))
    }
}

/// The token from an `Authorization: Bearer <token>` header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Resolve the principal for a WebSocket handshake. Browsers cannot set
/// headers on WebSocket requests, so a `token` query parameter is accepted
/// as well. Returns `None` for anonymous or invalid credentials.
pub fn resolve_principal(
    headers: &HeaderMap,
    query_token: Option<&str>,
    secret: &[u8],
) -> Option<Uuid> {
    let token = bearer_token(headers).or(query_token)?;
    verify_access_token(token, secret).and_then(|claims| claims.user_id())
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies the JWT,
/// and injects `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;

    let claims = verify_access_token(token, state.config.jwt_secret.as_bytes())
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))?;

    request.extensions_mut().insert(AuthenticatedUser(claims));

    Ok(next.run(request).await)
}
