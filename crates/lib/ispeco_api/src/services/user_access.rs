//! Delegated access CRUD for the authenticated owner.

use ispeco_core::access::queries::{get_grant_view, list_grants};
use ispeco_core::access::registry::{self, GrantPatch, GrantRequest};
use ispeco_core::models::access::GrantView;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{CreateUserAccessRequest, UpdateUserAccessRequest};

fn grant_not_found() -> AppError {
    AppError::NotFound("User access not found".into())
}

async fn view(state: &AppState, owner_id: Uuid, grant_id: Uuid) -> AppResult<GrantView> {
    get_grant_view(&state.pool, owner_id, grant_id)
        .await?
        .ok_or_else(grant_not_found)
}

pub async fn list_user_access(state: &AppState, owner_id: Uuid) -> AppResult<Vec<GrantView>> {
    Ok(list_grants(&state.pool, owner_id).await?)
}

pub async fn get_user_access(
    state: &AppState,
    owner_id: Uuid,
    grant_id: Uuid,
) -> AppResult<GrantView> {
    view(state, owner_id, grant_id).await
}

pub async fn create_user_access(
    state: &AppState,
    owner_id: Uuid,
    req: CreateUserAccessRequest,
) -> AppResult<GrantView> {
    let request = GrantRequest {
        grantee_email: req.email,
        user_role: req.user_role,
        camera_access: req.camera_access,
        notification_access: req.notification_access,
    };
    let created = registry::grant(state.store.as_ref(), owner_id, &request).await?;
    view(state, owner_id, created.id).await
}

pub async fn update_user_access(
    state: &AppState,
    owner_id: Uuid,
    grant_id: Uuid,
    req: UpdateUserAccessRequest,
) -> AppResult<GrantView> {
    let patch = GrantPatch {
        user_role: req.user_role,
        camera_access: req.camera_access,
        notification_access: req.notification_access,
    };
    registry::update(state.store.as_ref(), owner_id, grant_id, &patch).await?;
    view(state, owner_id, grant_id).await
}

pub async fn delete_user_access(state: &AppState, owner_id: Uuid, grant_id: Uuid) -> AppResult<()> {
    registry::revoke(state.store.as_ref(), owner_id, grant_id).await?;
    Ok(())
}
