//! Camera access control.
//!
//! [`policy`] is the pure decision function, [`registry`] manages the
//! delegated access grants it consults, and [`store`] is the storage seam
//! both run against.

pub mod policy;
pub mod queries;
pub mod registry;
pub mod store;

use thiserror::Error;
use uuid::Uuid;

use crate::models::InvalidChoice;
use crate::models::camera::Camera;
use policy::{Decision, Operation, authorize};
use store::AccessStore;

/// Message returned when a camera id does not resolve.
pub const CAMERA_NOT_FOUND: &str = "Camera not found";
/// Message returned when a principal may not perform an operation.
pub const CAMERA_FORBIDDEN: &str = "This user does not have access to this camera";

/// Access control and grant registry errors.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("No user with email {0}")]
    UnknownGrantee(String),

    #[error("Cannot grant access to yourself")]
    SelfGrant,

    #[error("Access has already been granted to this user")]
    DuplicateGrant,

    #[error("Invalid {field}: {source}")]
    InvalidChoice {
        field: &'static str,
        source: InvalidChoice,
    },

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
}

/// Load a camera and authorize `principal` for `operation` on it.
///
/// Existence is checked first: an unknown camera yields `NotFound` even for
/// a principal who could never have accessed it.
pub async fn check_camera(
    store: &dyn AccessStore,
    principal: Uuid,
    camera_id: Uuid,
    operation: Operation,
) -> Result<Camera, AccessError> {
    let camera = store
        .find_camera(camera_id)
        .await?
        .ok_or_else(|| AccessError::NotFound(CAMERA_NOT_FOUND.into()))?;

    let grant = if camera.owner_id == principal {
        None
    } else {
        store.find_grant_between(camera.owner_id, principal).await?
    };

    match authorize(principal, &camera, grant.as_ref(), operation) {
        Decision::Allow => Ok(camera),
        Decision::Deny(reason) => {
            tracing::debug!(
                camera_id = %camera.id,
                principal = %principal,
                ?operation,
                ?reason,
                "camera access denied"
            );
            Err(AccessError::Forbidden(CAMERA_FORBIDDEN.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::camera::Environment;
    use crate::test_support::{MemoryStore, camera_fixture};
    use crate::models::access::AccessRole;

    #[tokio::test]
    async fn unknown_camera_is_not_found() {
        let store = MemoryStore::default();
        let err = check_camera(&store, Uuid::now_v7(), Uuid::now_v7(), Operation::ReadMetadata)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotFound(m) if m == CAMERA_NOT_FOUND));
    }

    #[tokio::test]
    async fn owner_passes_every_check() {
        let store = MemoryStore::default();
        let owner = store.add_user("owner@example.com");
        let camera = store.add_camera(camera_fixture(owner, Environment::Indoor));

        for op in Operation::ALL {
            let loaded = check_camera(&store, owner, camera.id, op).await.unwrap();
            assert_eq!(loaded.id, camera.id);
        }
    }

    #[tokio::test]
    async fn stranger_is_forbidden_not_found() {
        let store = MemoryStore::default();
        let owner = store.add_user("owner@example.com");
        let stranger = store.add_user("stranger@example.com");
        let camera = store.add_camera(camera_fixture(owner, Environment::Indoor));

        let err = check_camera(&store, stranger, camera.id, Operation::Stream)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Forbidden(m) if m == CAMERA_FORBIDDEN));
    }

    #[tokio::test]
    async fn grantee_with_matching_scope_may_stream() {
        let store = MemoryStore::default();
        let owner = store.add_user("owner@example.com");
        let grantee = store.add_user("viewer@example.com");
        let camera = store.add_camera(camera_fixture(owner, Environment::Outdoor));
        store.add_grant(owner, grantee, AccessRole::Viewer, Environment::Outdoor);

        assert!(check_camera(&store, grantee, camera.id, Operation::Stream).await.is_ok());
        assert!(check_camera(&store, grantee, camera.id, Operation::Mutate).await.is_err());
    }
}
