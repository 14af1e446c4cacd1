//! Profile and password management for the authenticated user.

use ispeco_core::auth::password::{hash_password, validate_password, verify_password};
use ispeco_core::auth::{AuthError, queries};
use ispeco_core::models::auth::ProfileChanges;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{ChangePasswordRequest, UpdateProfileRequest, UserResponse};

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> AppResult<UserResponse> {
    let user = queries::get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(UserResponse::from(&user))
}

pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> AppResult<UserResponse> {
    let mut errors = FieldErrors::default();
    for (field, value) in [("first_name", &req.first_name), ("last_name", &req.last_name)] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            errors.add(field, "This field may not be blank.");
        }
    }
    errors.finish()?;

    let changes = ProfileChanges {
        first_name: req.first_name.map(|v| v.trim().to_string()),
        last_name: req.last_name.map(|v| v.trim().to_string()),
        phone_number: req.phone_number,
        address: req.address,
    };
    let user = queries::update_profile(pool, user_id, &changes)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(UserResponse::from(&user))
}

/// Check the new password pair before touching the database.
pub fn validate_new_password(req: &ChangePasswordRequest) -> AppResult<()> {
    if req.new_password1 != req.new_password2 {
        return Err(AppError::field(
            "new_password2",
            "The two password fields didn't match.",
        ));
    }
    if let Err(AuthError::ValidationError(msg)) = validate_password(&req.new_password1) {
        return Err(AppError::field("new_password1", msg));
    }
    Ok(())
}

pub async fn change_password(
    pool: &PgPool,
    user_id: Uuid,
    req: &ChangePasswordRequest,
) -> AppResult<()> {
    let current = queries::password_hash(pool, user_id)
        .await?
        .ok_or_else(user_not_found)?;
    if !verify_password(&req.old_password, &current)? {
        return Err(AppError::field("old_password", "Wrong password."));
    }
    validate_new_password(req)?;

    queries::set_password_hash(pool, user_id, &hash_password(&req.new_password1)?).await?;
    // Existing sessions end with the old password.
    queries::revoke_all_refresh_tokens(pool, user_id).await?;
    info!(user_id = %user_id, "password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(new1: &str, new2: &str) -> ChangePasswordRequest {
        ChangePasswordRequest {
            old_password: "old-password".into(),
            new_password1: new1.into(),
            new_password2: new2.into(),
        }
    }

    #[test]
    fn mismatched_passwords_are_rejected() {
        let err = validate_new_password(&request("new-password-1", "new-password-2")).unwrap_err();
        assert!(matches!(err, AppError::InvalidFields(f) if f.contains_key("new_password2")));
    }

    #[test]
    fn weak_new_password_is_rejected() {
        let err = validate_new_password(&request("short", "short")).unwrap_err();
        assert!(matches!(err, AppError::InvalidFields(f) if f.contains_key("new_password1")));
    }

    #[test]
    fn matching_strong_password_passes() {
        assert!(validate_new_password(&request("a-much-better-one", "a-much-better-one")).is_ok());
    }
}
