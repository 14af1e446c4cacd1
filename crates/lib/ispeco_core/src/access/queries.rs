//! Delegated access database queries.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::access::{DelegatedAccess, GrantChanges, GrantView, NewGrant};
use crate::uuid::uuidv7;

const GRANT_COLUMNS: &str = "id, owner_id, grantee_id, user_role, camera_access, \
                             notification_access, created_at, updated_at";

const GRANT_VIEW_SELECT: &str = r#"
    SELECT ua.id,
           btrim(u.first_name || ' ' || u.last_name) AS user_full_name,
           u.email AS user_email,
           u.phone_number AS user_phone_number,
           ua.user_role,
           ua.camera_access,
           ua.notification_access
    FROM user_access ua
    JOIN users u ON u.id = ua.grantee_id
"#;

pub async fn insert_grant(pool: &PgPool, grant: &NewGrant) -> Result<DelegatedAccess, sqlx::Error> {
    sqlx::query_as::<_, DelegatedAccess>(&format!(
        "INSERT INTO user_access (id, owner_id, grantee_id, user_role, camera_access, notification_access) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {GRANT_COLUMNS}"
    ))
    .bind(uuidv7())
    .bind(grant.owner_id)
    .bind(grant.grantee_id)
    .bind(grant.user_role)
    .bind(grant.camera_access)
    .bind(grant.notification_access)
    .fetch_one(pool)
    .await
}

pub async fn find_grant(pool: &PgPool, grant_id: Uuid) -> Result<Option<DelegatedAccess>, sqlx::Error> {
    sqlx::query_as::<_, DelegatedAccess>(&format!(
        "SELECT {GRANT_COLUMNS} FROM user_access WHERE id = $1"
    ))
    .bind(grant_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_grant_between(
    pool: &PgPool,
    owner_id: Uuid,
    grantee_id: Uuid,
) -> Result<Option<DelegatedAccess>, sqlx::Error> {
    sqlx::query_as::<_, DelegatedAccess>(&format!(
        "SELECT {GRANT_COLUMNS} FROM user_access WHERE owner_id = $1 AND grantee_id = $2"
    ))
    .bind(owner_id)
    .bind(grantee_id)
    .fetch_optional(pool)
    .await
}

pub async fn update_grant(
    pool: &PgPool,
    grant_id: Uuid,
    changes: &GrantChanges,
) -> Result<Option<DelegatedAccess>, sqlx::Error> {
    sqlx::query_as::<_, DelegatedAccess>(&format!(
        "UPDATE user_access SET \
            user_role = COALESCE($2, user_role), \
            camera_access = COALESCE($3, camera_access), \
            notification_access = COALESCE($4, notification_access), \
            updated_at = now() \
         WHERE id = $1 \
         RETURNING {GRANT_COLUMNS}"
    ))
    .bind(grant_id)
    .bind(changes.user_role)
    .bind(changes.camera_access)
    .bind(changes.notification_access)
    .fetch_optional(pool)
    .await
}

pub async fn delete_grant(pool: &PgPool, grant_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM user_access WHERE id = $1")
        .bind(grant_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Grants an owner has issued, joined with each grantee's profile.
pub async fn list_grants(pool: &PgPool, owner_id: Uuid) -> Result<Vec<GrantView>, sqlx::Error> {
    sqlx::query_as::<_, GrantView>(&format!(
        "{GRANT_VIEW_SELECT} WHERE ua.owner_id = $1 ORDER BY ua.created_at, ua.id"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

/// One grant as seen by its owner. `None` if missing or owned by someone else.
pub async fn get_grant_view(
    pool: &PgPool,
    owner_id: Uuid,
    grant_id: Uuid,
) -> Result<Option<GrantView>, sqlx::Error> {
    sqlx::query_as::<_, GrantView>(&format!(
        "{GRANT_VIEW_SELECT} WHERE ua.owner_id = $1 AND ua.id = $2"
    ))
    .bind(owner_id)
    .bind(grant_id)
    .fetch_optional(pool)
    .await
}
