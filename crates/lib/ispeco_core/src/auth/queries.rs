//! User and refresh-token database queries.

use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{NewUser, ProfileChanges, User};
use crate::uuid::uuidv7;

const USER_COLUMNS: &str = "id, email, first_name, last_name, phone_number, address, \
                            is_active, is_staff, date_joined";

/// Normalize an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Fetch a user and their password hash by email.
pub async fn find_user_with_password(
    pool: &PgPool,
    email: &str,
) -> Result<Option<(User, String)>, AuthError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(normalize_email(email))
    .fetch_optional(pool)
    .await?;

    let Some(user) = user else {
        return Ok(None);
    };

    let hash = password_hash(pool, user.id).await?;
    Ok(hash.map(|h| (user, h)))
}

/// Fetch the stored password hash for a user.
pub async fn password_hash(pool: &PgPool, user_id: Uuid) -> Result<Option<String>, AuthError> {
    let hash = sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(hash)
}

/// Look up a user id by email.
pub async fn find_user_id_by_email(pool: &PgPool, email: &str) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await
}

/// Create a new user.
pub async fn create_user(pool: &PgPool, new_user: &NewUser<'_>) -> Result<User, AuthError> {
    let result = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, password_hash, first_name, last_name, phone_number, address, is_staff) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(normalize_email(new_user.email))
    .bind(new_user.password_hash)
    .bind(new_user.first_name)
    .bind(new_user.last_name)
    .bind(new_user.phone_number)
    .bind(new_user.address)
    .bind(new_user.is_staff)
    .fetch_one(pool)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(AuthError::DuplicateEmail),
        Err(e) => Err(e.into()),
    }
}

/// Check whether an email is already registered.
pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, AuthError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(normalize_email(email))
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Fetch a user by ID.
pub async fn get_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, AuthError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Apply a partial profile update, returning the updated user.
pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    changes: &ProfileChanges,
) -> Result<Option<User>, AuthError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET \
            first_name = COALESCE($2, first_name), \
            last_name = COALESCE($3, last_name), \
            phone_number = COALESCE($4, phone_number), \
            address = COALESCE($5, address) \
         WHERE id = $1 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(changes.first_name.as_deref())
    .bind(changes.last_name.as_deref())
    .bind(changes.phone_number.as_deref())
    .bind(changes.address.as_deref())
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Replace a user's password hash.
pub async fn set_password_hash(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<(), AuthError> {
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Store a refresh token hash.
pub async fn store_refresh_token(
    pool: &PgPool,
    token_hash: &str,
    user_id: Uuid,
    expires_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), AuthError> {
    sqlx::query(
        "INSERT INTO refresh_tokens (id, token_hash, user_id, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(uuidv7())
    .bind(token_hash)
    .bind(user_id)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Find a valid, non-revoked, non-expired refresh token. Returns (token_id, user_id).
pub async fn find_valid_refresh_token(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<(Uuid, Uuid)>, AuthError> {
    let row = sqlx::query_as::<_, (Uuid, Uuid)>(
        "SELECT rt.id, rt.user_id \
         FROM refresh_tokens rt \
         WHERE rt.token_hash = $1 \
           AND rt.revoked_at IS NULL \
           AND rt.expires_at > now()",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Revoke a refresh token by ID. Returns false if it was already revoked.
pub async fn revoke_refresh_token(pool: &PgPool, token_id: Uuid) -> Result<bool, AuthError> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = now() WHERE id = $1 AND revoked_at IS NULL",
    )
    .bind(token_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Revoke a refresh token by hash.
pub async fn revoke_refresh_token_by_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<(), AuthError> {
    sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = now() \
         WHERE token_hash = $1 AND revoked_at IS NULL",
    )
    .bind(token_hash)
    .execute(pool)
    .await?;
    Ok(())
}

/// Revoke all refresh tokens for a user.
pub async fn revoke_all_refresh_tokens(pool: &PgPool, user_id: Uuid) -> Result<u64, AuthError> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = now() \
         WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
