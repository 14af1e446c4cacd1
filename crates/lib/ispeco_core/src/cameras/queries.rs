//! Camera database queries.
//!
//! Raw SQLx queries for CRUD operations on `cameras` and their
//! `camera_setups` rows.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::camera::{Camera, CameraChanges, NewCamera};
use crate::models::setup::{CameraSetup, SetupFields};
use crate::uuid::uuidv7;

const CAMERA_COLUMNS: &str = "id, owner_id, name, camera_type, industry_type, environment, \
                              resolution, brand, encrypted_url, encrypted_password, \
                              created_at, updated_at";

/// Insert a new camera.
pub async fn insert_camera(pool: &PgPool, camera: &NewCamera) -> Result<Camera, sqlx::Error> {
    sqlx::query_as::<_, Camera>(&format!(
        "INSERT INTO cameras (id, owner_id, name, camera_type, industry_type, environment, \
                              resolution, brand, encrypted_url, encrypted_password) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {CAMERA_COLUMNS}"
    ))
    .bind(uuidv7())
    .bind(camera.owner_id)
    .bind(&camera.name)
    .bind(camera.camera_type)
    .bind(camera.industry_type)
    .bind(camera.environment)
    .bind(camera.resolution)
    .bind(camera.brand)
    .bind(camera.encrypted_url.as_deref())
    .bind(camera.encrypted_password.as_deref())
    .fetch_one(pool)
    .await
}

/// Get a single camera by ID.
pub async fn get_camera(pool: &PgPool, camera_id: Uuid) -> Result<Option<Camera>, sqlx::Error> {
    sqlx::query_as::<_, Camera>(&format!(
        "SELECT {CAMERA_COLUMNS} FROM cameras WHERE id = $1"
    ))
    .bind(camera_id)
    .fetch_optional(pool)
    .await
}

/// List cameras owned by a user.
pub async fn list_owned_cameras(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Camera>, sqlx::Error> {
    sqlx::query_as::<_, Camera>(&format!(
        "SELECT {CAMERA_COLUMNS} FROM cameras WHERE owner_id = $1 ORDER BY id"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

/// List cameras other users have shared with `grantee_id`.
///
/// A camera is shared when its owner granted the user access; the grant's
/// camera scope does not filter this list (metadata is readable with any
/// grant).
pub async fn list_shared_cameras(
    pool: &PgPool,
    grantee_id: Uuid,
) -> Result<Vec<Camera>, sqlx::Error> {
    sqlx::query_as::<_, Camera>(
        r#"
        SELECT c.id, c.owner_id, c.name, c.camera_type, c.industry_type, c.environment,
               c.resolution, c.brand, c.encrypted_url, c.encrypted_password,
               c.created_at, c.updated_at
        FROM cameras c
        JOIN user_access ua ON ua.owner_id = c.owner_id
        WHERE ua.grantee_id = $1
        ORDER BY c.id
        "#,
    )
    .bind(grantee_id)
    .fetch_all(pool)
    .await
}

/// Apply a partial update. Returns `None` if the camera no longer exists.
///
/// Secrets carry an explicit write flag so they can be cleared as well as
/// replaced.
pub async fn update_camera(
    pool: &PgPool,
    camera_id: Uuid,
    changes: &CameraChanges,
) -> Result<Option<Camera>, sqlx::Error> {
    sqlx::query_as::<_, Camera>(&format!(
        "UPDATE cameras SET \
            name = COALESCE($2, name), \
            camera_type = COALESCE($3, camera_type), \
            industry_type = COALESCE($4, industry_type), \
            environment = COALESCE($5, environment), \
            resolution = COALESCE($6, resolution), \
            brand = COALESCE($7, brand), \
            encrypted_url = CASE WHEN $8 THEN $9 ELSE encrypted_url END, \
            encrypted_password = CASE WHEN $10 THEN $11 ELSE encrypted_password END, \
            updated_at = now() \
         WHERE id = $1 \
         RETURNING {CAMERA_COLUMNS}"
    ))
    .bind(camera_id)
    .bind(changes.name.as_deref())
    .bind(changes.camera_type)
    .bind(changes.industry_type)
    .bind(changes.environment)
    .bind(changes.resolution)
    .bind(changes.brand)
    .bind(changes.encrypted_url.writes())
    .bind(changes.encrypted_url.value())
    .bind(changes.encrypted_password.writes())
    .bind(changes.encrypted_password.value())
    .fetch_optional(pool)
    .await
}

/// Delete a camera. Returns false if it did not exist.
pub async fn delete_camera(pool: &PgPool, camera_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cameras WHERE id = $1")
        .bind(camera_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

const SETUP_COLUMNS: &str = "camera_id, address_line_1, address_line_2, city, zip_code, \
                             state_province, country, installed_on, installed_at, \
                             installation_notes, created_at, updated_at";

/// Installation record of a camera, if one was recorded.
pub async fn get_setup(pool: &PgPool, camera_id: Uuid) -> Result<Option<CameraSetup>, sqlx::Error> {
    sqlx::query_as::<_, CameraSetup>(&format!(
        "SELECT {SETUP_COLUMNS} FROM camera_setups WHERE camera_id = $1"
    ))
    .bind(camera_id)
    .fetch_optional(pool)
    .await
}

/// Create or replace the installation record of a camera.
pub async fn upsert_setup(
    pool: &PgPool,
    camera_id: Uuid,
    fields: &SetupFields,
) -> Result<CameraSetup, sqlx::Error> {
    sqlx::query_as::<_, CameraSetup>(&format!(
        "INSERT INTO camera_setups (camera_id, address_line_1, address_line_2, city, zip_code, \
                                    state_province, country, installed_on, installed_at, \
                                    installation_notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (camera_id) DO UPDATE SET \
            address_line_1 = EXCLUDED.address_line_1, \
            address_line_2 = EXCLUDED.address_line_2, \
            city = EXCLUDED.city, \
            zip_code = EXCLUDED.zip_code, \
            state_province = EXCLUDED.state_province, \
            country = EXCLUDED.country, \
            installed_on = EXCLUDED.installed_on, \
            installed_at = EXCLUDED.installed_at, \
            installation_notes = EXCLUDED.installation_notes, \
            updated_at = now() \
         RETURNING {SETUP_COLUMNS}"
    ))
    .bind(camera_id)
    .bind(&fields.address_line_1)
    .bind(fields.address_line_2.as_deref())
    .bind(&fields.city)
    .bind(&fields.zip_code)
    .bind(&fields.state_province)
    .bind(&fields.country)
    .bind(fields.installed_on)
    .bind(fields.installed_at)
    .bind(&fields.installation_notes)
    .fetch_one(pool)
    .await
}

/// Delete the installation record. Returns false if there was none.
pub async fn delete_setup(pool: &PgPool, camera_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM camera_setups WHERE camera_id = $1")
        .bind(camera_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}
