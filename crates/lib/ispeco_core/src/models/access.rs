//! Delegated access domain models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::camera::Environment;
use super::choice_enum;

choice_enum! {
    /// Role a grantee holds on the owner's account.
    pub enum AccessRole in "access_role" {
        Admin => "admin",
        Viewer => "viewer",
        Other => "other",
    }
}

/// Database row for `user_access`: one owner sharing cameras with one grantee.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DelegatedAccess {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub grantee_id: Uuid,
    pub user_role: AccessRole,
    pub camera_access: Environment,
    pub notification_access: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Values for a new grant row.
#[derive(Debug, Clone)]
pub struct NewGrant {
    pub owner_id: Uuid,
    pub grantee_id: Uuid,
    pub user_role: AccessRole,
    pub camera_access: Environment,
    pub notification_access: bool,
}

/// Partial update of a grant. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantChanges {
    pub user_role: Option<AccessRole>,
    pub camera_access: Option<Environment>,
    pub notification_access: Option<bool>,
}

impl GrantChanges {
    pub fn is_empty(&self) -> bool {
        self.user_role.is_none() && self.camera_access.is_none() && self.notification_access.is_none()
    }
}

/// Grant joined with the grantee's profile, as listed to the owner.
///
/// Never carries the grantee's password hash or any camera secret.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GrantView {
    pub id: Uuid,
    pub user_full_name: String,
    pub user_email: String,
    pub user_phone_number: Option<String>,
    pub user_role: AccessRole,
    pub camera_access: Environment,
    pub notification_access: bool,
}
