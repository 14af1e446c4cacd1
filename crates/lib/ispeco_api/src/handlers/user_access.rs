//! Delegated access handlers, scoped to grants the caller issued.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use ispeco_core::models::access::GrantView;
use ispeco_core::uuid::parse_id;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{CreateUserAccessRequest, UpdateUserAccessRequest};
use crate::services::user_access;

fn grant_id(raw: &str) -> AppResult<Uuid> {
    parse_id(raw).ok_or_else(|| AppError::NotFound("User access not found".into()))
}

/// `GET /users/me/user-access`
pub async fn list_user_access_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<GrantView>>> {
    Ok(Json(
        user_access::list_user_access(&state, user.user_id()?).await?,
    ))
}

/// `POST /users/me/user-access`
pub async fn create_user_access_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(body): AppJson<CreateUserAccessRequest>,
) -> AppResult<(StatusCode, Json<GrantView>)> {
    let grant = user_access::create_user_access(&state, user.user_id()?, body).await?;
    Ok((StatusCode::CREATED, Json(grant)))
}

/// `GET /users/me/user-access/{id}`
pub async fn get_user_access_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<GrantView>> {
    Ok(Json(
        user_access::get_user_access(&state, user.user_id()?, grant_id(&id)?).await?,
    ))
}

/// `PATCH /users/me/user-access/{id}`
pub async fn update_user_access_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateUserAccessRequest>,
) -> AppResult<Json<GrantView>> {
    Ok(Json(
        user_access::update_user_access(&state, user.user_id()?, grant_id(&id)?, body).await?,
    ))
}

/// `DELETE /users/me/user-access/{id}`
pub async fn delete_user_access_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    user_access::delete_user_access(&state, user.user_id()?, grant_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
