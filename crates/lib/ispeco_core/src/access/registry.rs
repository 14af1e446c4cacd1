//! Delegated access registry.
//!
//! Owners share their cameras with other users by issuing one grant per
//! grantee. Only the issuing owner may change or revoke a grant.

use std::str::FromStr;

use tracing::info;
use uuid::Uuid;

use super::AccessError;
use super::store::AccessStore;
use crate::models::InvalidChoice;
use crate::models::access::{AccessRole, DelegatedAccess, GrantChanges, NewGrant};
use crate::models::camera::Environment;

const GRANT_NOT_FOUND: &str = "User access not found";

/// Raw grant request as received from a caller. Choice fields are validated
/// by [`grant`].
#[derive(Debug, Clone)]
pub struct GrantRequest {
    pub grantee_email: String,
    pub user_role: String,
    pub camera_access: String,
    pub notification_access: bool,
}

/// Raw partial grant update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct GrantPatch {
    pub user_role: Option<String>,
    pub camera_access: Option<String>,
    pub notification_access: Option<bool>,
}

fn parse_choice<T>(field: &'static str, value: &str) -> Result<T, AccessError>
where
    T: FromStr<Err = InvalidChoice>,
{
    value
        .parse()
        .map_err(|source| AccessError::InvalidChoice { field, source })
}

fn validate_patch(patch: &GrantPatch) -> Result<GrantChanges, AccessError> {
    Ok(GrantChanges {
        user_role: patch
            .user_role
            .as_deref()
            .map(|v| parse_choice::<AccessRole>("user_role", v))
            .transpose()?,
        camera_access: patch
            .camera_access
            .as_deref()
            .map(|v| parse_choice::<Environment>("camera_access", v))
            .transpose()?,
        notification_access: patch.notification_access,
    })
}

/// Issue a grant from `owner_id` to the user registered under
/// `request.grantee_email`.
pub async fn grant(
    store: &dyn AccessStore,
    owner_id: Uuid,
    request: &GrantRequest,
) -> Result<DelegatedAccess, AccessError> {
    let user_role = parse_choice::<AccessRole>("user_role", &request.user_role)?;
    let camera_access = parse_choice::<Environment>("camera_access", &request.camera_access)?;

    let grantee_id = store
        .find_user_id_by_email(&request.grantee_email)
        .await?
        .ok_or_else(|| AccessError::UnknownGrantee(request.grantee_email.trim().to_string()))?;

    if grantee_id == owner_id {
        return Err(AccessError::SelfGrant);
    }

    if store.find_grant_between(owner_id, grantee_id).await?.is_some() {
        return Err(AccessError::DuplicateGrant);
    }

    let created = store
        .insert_grant(&NewGrant {
            owner_id,
            grantee_id,
            user_role,
            camera_access,
            notification_access: request.notification_access,
        })
        .await?;

    info!(grant_id = %created.id, owner_id = %owner_id, grantee_id = %grantee_id, "access granted");
    Ok(created)
}

/// Load a grant, failing with `NotFound` unless `owner_id` issued it.
async fn owned_grant(
    store: &dyn AccessStore,
    owner_id: Uuid,
    grant_id: Uuid,
) -> Result<DelegatedAccess, AccessError> {
    store
        .find_grant(grant_id)
        .await?
        .filter(|g| g.owner_id == owner_id)
        .ok_or_else(|| AccessError::NotFound(GRANT_NOT_FOUND.into()))
}

/// Revoke a grant issued by `owner_id`.
pub async fn revoke(
    store: &dyn AccessStore,
    owner_id: Uuid,
    grant_id: Uuid,
) -> Result<(), AccessError> {
    owned_grant(store, owner_id, grant_id).await?;
    if !store.delete_grant(grant_id).await? {
        return Err(AccessError::NotFound(GRANT_NOT_FOUND.into()));
    }
    info!(grant_id = %grant_id, owner_id = %owner_id, "access revoked");
    Ok(())
}

/// Apply a partial update to a grant issued by `owner_id`.
pub async fn update(
    store: &dyn AccessStore,
    owner_id: Uuid,
    grant_id: Uuid,
    patch: &GrantPatch,
) -> Result<DelegatedAccess, AccessError> {
    let changes = validate_patch(patch)?;
    let current = owned_grant(store, owner_id, grant_id).await?;
    if changes.is_empty() {
        return Ok(current);
    }
    store
        .update_grant(grant_id, &changes)
        .await?
        .ok_or_else(|| AccessError::NotFound(GRANT_NOT_FOUND.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStore;

    fn request(email: &str) -> GrantRequest {
        GrantRequest {
            grantee_email: email.into(),
            user_role: "viewer".into(),
            camera_access: "indoor".into(),
            notification_access: true,
        }
    }

    #[tokio::test]
    async fn grant_creates_row_for_known_grantee() {
        let store = MemoryStore::default();
        let owner = store.add_user("owner@example.com");
        let grantee = store.add_user("viewer@example.com");

        let created = grant(&store, owner, &request("Viewer@Example.com")).await.unwrap();
        assert_eq!(created.owner_id, owner);
        assert_eq!(created.grantee_id, grantee);
        assert_eq!(created.user_role, AccessRole::Viewer);
        assert_eq!(created.camera_access, Environment::Indoor);
        assert!(created.notification_access);
    }

    #[tokio::test]
    async fn second_grant_for_pair_is_duplicate() {
        let store = MemoryStore::default();
        let owner = store.add_user("owner@example.com");
        store.add_user("viewer@example.com");

        grant(&store, owner, &request("viewer@example.com")).await.unwrap();
        let err = grant(&store, owner, &request("viewer@example.com")).await.unwrap_err();
        assert!(matches!(err, AccessError::DuplicateGrant));
    }

    #[tokio::test]
    async fn unknown_grantee_is_rejected() {
        let store = MemoryStore::default();
        let owner = store.add_user("owner@example.com");
        let err = grant(&store, owner, &request("ghost@example.com")).await.unwrap_err();
        assert!(matches!(err, AccessError::UnknownGrantee(e) if e == "ghost@example.com"));
    }

    #[tokio::test]
    async fn owner_cannot_grant_self() {
        let store = MemoryStore::default();
        let owner = store.add_user("owner@example.com");
        let err = grant(&store, owner, &request("owner@example.com")).await.unwrap_err();
        assert!(matches!(err, AccessError::SelfGrant));
    }

    #[tokio::test]
    async fn invalid_choice_names_the_field() {
        let store = MemoryStore::default();
        let owner = store.add_user("owner@example.com");
        store.add_user("viewer@example.com");

        let mut bad = request("viewer@example.com");
        bad.camera_access = "garage".into();
        let err = grant(&store, owner, &bad).await.unwrap_err();
        assert!(matches!(err, AccessError::InvalidChoice { field: "camera_access", .. }));
        assert_eq!(store.grant_count(), 0);
    }

    #[tokio::test]
    async fn only_issuing_owner_may_revoke() {
        let store = MemoryStore::default();
        let owner = store.add_user("owner@example.com");
        let other = store.add_user("other@example.com");
        store.add_user("viewer@example.com");
        let created = grant(&store, owner, &request("viewer@example.com")).await.unwrap();

        let err = revoke(&store, other, created.id).await.unwrap_err();
        assert!(matches!(err, AccessError::NotFound(_)));
        assert_eq!(store.grant_count(), 1);

        revoke(&store, owner, created.id).await.unwrap();
        assert_eq!(store.grant_count(), 0);

        let err = revoke(&store, owner, created.id).await.unwrap_err();
        assert!(matches!(err, AccessError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_applies_only_supplied_fields() {
        let store = MemoryStore::default();
        let owner = store.add_user("owner@example.com");
        store.add_user("viewer@example.com");
        let created = grant(&store, owner, &request("viewer@example.com")).await.unwrap();

        let patch = GrantPatch {
            camera_access: Some("both".into()),
            ..Default::default()
        };
        let updated = update(&store, owner, created.id, &patch).await.unwrap();
        assert_eq!(updated.camera_access, Environment::Both);
        assert_eq!(updated.user_role, AccessRole::Viewer);
        assert!(updated.notification_access);
    }

    #[tokio::test]
    async fn update_revalidates_choices() {
        let store = MemoryStore::default();
        let owner = store.add_user("owner@example.com");
        store.add_user("viewer@example.com");
        let created = grant(&store, owner, &request("viewer@example.com")).await.unwrap();

        let patch = GrantPatch {
            user_role: Some("superuser".into()),
            ..Default::default()
        };
        let err = update(&store, owner, created.id, &patch).await.unwrap_err();
        assert!(matches!(err, AccessError::InvalidChoice { field: "user_role", .. }));
    }

    #[tokio::test]
    async fn update_by_non_owner_is_not_found() {
        let store = MemoryStore::default();
        let owner = store.add_user("owner@example.com");
        let grantee = store.add_user("viewer@example.com");
        let created = grant(&store, owner, &request("viewer@example.com")).await.unwrap();

        let patch = GrantPatch {
            camera_access: Some("both".into()),
            ..Default::default()
        };
        let err = update(&store, grantee, created.id, &patch).await.unwrap_err();
        assert!(matches!(err, AccessError::NotFound(_)));
    }
}
