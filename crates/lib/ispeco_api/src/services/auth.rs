//! Authentication service: register/login/refresh flows delegating to
//! `ispeco_core::auth`.

use chrono::{Duration, Utc};
use ispeco_core::auth::jwt::{ACCESS_TOKEN_EXPIRY_SECS, generate_access_token};
use ispeco_core::auth::password::{hash_password, validate_password, verify_password};
use ispeco_core::auth::tokens::{generate_token, hash_token};
use ispeco_core::auth::{AuthError, queries};
use ispeco_core::models::auth::{NewUser, User};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{LogoutResponse, RegisterRequest, TokenResponse, UserResponse};

/// Refresh token lifetime: 30 days.
const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Unable to log in with provided credentials.".into())
}

/// Issue an access token and a stored refresh token for `user`.
async fn issue_tokens(pool: &PgPool, user: &User, jwt_secret: &[u8]) -> AppResult<TokenResponse> {
    let access_token =
        generate_access_token(&user.id.to_string(), &user.email, user.is_staff, jwt_secret)?;
    let refresh_token = generate_token();
    let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);
    queries::store_refresh_token(pool, &hash_token(&refresh_token), user.id, expires_at).await?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
        expires_in: ACCESS_TOKEN_EXPIRY_SECS,
        token_type: "Bearer".to_string(),
        user: UserResponse::from(user),
    })
}

/// Check registration input, collecting every problem.
pub fn validate_registration(req: &RegisterRequest) -> AppResult<()> {
    let mut errors = FieldErrors::default();
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        errors.add("email", "Enter a valid email address.");
    }
    if req.first_name.trim().is_empty() {
        errors.add("first_name", "This field may not be blank.");
    }
    if req.last_name.trim().is_empty() {
        errors.add("last_name", "This field may not be blank.");
    }
    if let Err(AuthError::ValidationError(msg)) = validate_password(&req.password) {
        errors.add("password", msg);
    }
    errors.finish()
}

/// Register a new user account.
pub async fn register(
    pool: &PgPool,
    req: &RegisterRequest,
    jwt_secret: &[u8],
) -> AppResult<TokenResponse> {
    validate_registration(req)?;

    if queries::email_exists(pool, &req.email).await? {
        return Err(AuthError::DuplicateEmail.into());
    }

    let pw_hash = hash_password(&req.password)?;
    let user = queries::create_user(
        pool,
        &NewUser {
            email: &req.email,
            password_hash: &pw_hash,
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
            phone_number: req.phone_number.as_deref(),
            address: req.address.as_deref(),
            is_staff: false,
        },
    )
    .await?;
    info!(user_id = %user.id, "user registered");

    issue_tokens(pool, &user, jwt_secret).await
}

/// Authenticate with email + password.
pub async fn login(
    pool: &PgPool,
    email: &str,
    password: &str,
    jwt_secret: &[u8],
) -> AppResult<TokenResponse> {
    let (user, pw_hash) = queries::find_user_with_password(pool, email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(password, &pw_hash)? {
        return Err(invalid_credentials());
    }
    if !user.is_active {
        return Err(invalid_credentials());
    }

    issue_tokens(pool, &user, jwt_secret).await
}

/// Refresh an access token using a refresh token (single-use rotation).
pub async fn refresh(
    pool: &PgPool,
    refresh_token: &str,
    jwt_secret: &[u8],
) -> AppResult<TokenResponse> {
    let (token_id, user_id) = queries::find_valid_refresh_token(pool, &hash_token(refresh_token))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".into()))?;

    // A concurrent refresh may already have consumed this token.
    if !queries::revoke_refresh_token(pool, token_id).await? {
        return Err(AppError::Unauthorized("Invalid refresh token".into()));
    }

    let user = queries::get_user_by_id(pool, user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    issue_tokens(pool, &user, jwt_secret).await
}

/// Logout: revoke a specific refresh token.
pub async fn logout(pool: &PgPool, refresh_token: Option<&str>) -> AppResult<LogoutResponse> {
    if let Some(token) = refresh_token {
        queries::revoke_refresh_token_by_hash(pool, &hash_token(token)).await?;
    }
    Ok(LogoutResponse {
        success: true,
        revoked: None,
    })
}

/// Logout all sessions: revoke all refresh tokens for a user.
pub async fn logout_all(pool: &PgPool, user_id: Uuid) -> AppResult<LogoutResponse> {
    let revoked = queries::revoke_all_refresh_tokens(pool, user_id).await?;
    info!(user_id = %user_id, revoked, "all sessions revoked");
    Ok(LogoutResponse {
        success: true,
        revoked: Some(revoked),
    })
}
