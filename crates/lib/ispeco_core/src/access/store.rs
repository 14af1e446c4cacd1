//! Storage seam for access control.
//!
//! The policy and registry only need a handful of lookups and writes; they
//! run against this trait so the decision logic can be exercised without a
//! database.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::AccessError;
use super::queries;
use crate::auth::queries::find_user_id_by_email;
use crate::cameras::queries::get_camera;
use crate::models::access::{DelegatedAccess, GrantChanges, NewGrant};
use crate::models::camera::Camera;

#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn find_camera(&self, camera_id: Uuid) -> Result<Option<Camera>, AccessError>;

    /// The grant `owner_id` gave `grantee_id`, if any.
    async fn find_grant_between(
        &self,
        owner_id: Uuid,
        grantee_id: Uuid,
    ) -> Result<Option<DelegatedAccess>, AccessError>;

    async fn find_grant(&self, grant_id: Uuid) -> Result<Option<DelegatedAccess>, AccessError>;

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>, AccessError>;

    /// Insert a grant. A second grant for the same pair is `DuplicateGrant`.
    async fn insert_grant(&self, grant: &NewGrant) -> Result<DelegatedAccess, AccessError>;

    async fn update_grant(
        &self,
        grant_id: Uuid,
        changes: &GrantChanges,
    ) -> Result<Option<DelegatedAccess>, AccessError>;

    /// Returns false if the grant did not exist.
    async fn delete_grant(&self, grant_id: Uuid) -> Result<bool, AccessError>;
}

/// PostgreSQL-backed [`AccessStore`].
#[derive(Clone)]
pub struct PgAccessStore {
    pool: PgPool,
}

impl PgAccessStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccessStore for PgAccessStore {
    async fn find_camera(&self, camera_id: Uuid) -> Result<Option<Camera>, AccessError> {
        Ok(get_camera(&self.pool, camera_id).await?)
    }

    async fn find_grant_between(
        &self,
        owner_id: Uuid,
        grantee_id: Uuid,
    ) -> Result<Option<DelegatedAccess>, AccessError> {
        Ok(queries::find_grant_between(&self.pool, owner_id, grantee_id).await?)
    }

    async fn find_grant(&self, grant_id: Uuid) -> Result<Option<DelegatedAccess>, AccessError> {
        Ok(queries::find_grant(&self.pool, grant_id).await?)
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>, AccessError> {
        Ok(find_user_id_by_email(&self.pool, email).await?)
    }

    async fn insert_grant(&self, grant: &NewGrant) -> Result<DelegatedAccess, AccessError> {
        match queries::insert_grant(&self.pool, grant).await {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AccessError::DuplicateGrant)
            }
            Err(sqlx::Error::Database(db)) if db.is_check_violation() => {
                Err(AccessError::SelfGrant)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_grant(
        &self,
        grant_id: Uuid,
        changes: &GrantChanges,
    ) -> Result<Option<DelegatedAccess>, AccessError> {
        Ok(queries::update_grant(&self.pool, grant_id, changes).await?)
    }

    async fn delete_grant(&self, grant_id: Uuid) -> Result<bool, AccessError> {
        Ok(queries::delete_grant(&self.pool, grant_id).await?)
    }
}
