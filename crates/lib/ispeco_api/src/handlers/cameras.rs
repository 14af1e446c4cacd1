//! Camera handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use ispeco_core::access::CAMERA_NOT_FOUND;
use ispeco_core::uuid::parse_id;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    CameraPasswordResponse, CameraResponse, CameraSetupRequest, CameraSetupResponse,
    CameraUrlResponse, CreateCameraRequest, UpdateCameraRequest,
};
use crate::services::{camera_setup, cameras};

/// Malformed ids cannot name a camera, so they are reported as missing.
fn camera_id(raw: &str) -> AppResult<Uuid> {
    parse_id(raw).ok_or_else(|| AppError::NotFound(CAMERA_NOT_FOUND.into()))
}

/// `GET /cameras`: cameras owned by the caller.
pub async fn list_cameras_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<CameraResponse>>> {
    Ok(Json(cameras::list_cameras(&state, user.user_id()?).await?))
}

/// `POST /cameras`
pub async fn create_camera_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(body): AppJson<CreateCameraRequest>,
) -> AppResult<(StatusCode, Json<CameraResponse>)> {
    let camera = cameras::create_camera(&state, user.user_id()?, &body).await?;
    Ok((StatusCode::CREATED, Json(camera)))
}

/// `GET /cameras/shared`: cameras other users shared with the caller.
pub async fn list_shared_cameras_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<CameraResponse>>> {
    Ok(Json(
        cameras::list_shared_cameras(&state, user.user_id()?).await?,
    ))
}

/// `GET /cameras/{id}`
pub async fn get_camera_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<CameraResponse>> {
    Ok(Json(
        cameras::get_camera(&state, user.user_id()?, camera_id(&id)?).await?,
    ))
}

/// `PATCH /cameras/{id}`: owner only.
pub async fn update_camera_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateCameraRequest>,
) -> AppResult<Json<CameraResponse>> {
    Ok(Json(
        cameras::update_camera(&state, user.user_id()?, camera_id(&id)?, &body).await?,
    ))
}

/// `DELETE /cameras/{id}`: owner only.
pub async fn delete_camera_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    cameras::delete_camera(&state, user.user_id()?, camera_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /cameras/{id}/url`: owner only.
pub async fn camera_url_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<CameraUrlResponse>> {
    Ok(Json(
        cameras::camera_url(&state, user.user_id()?, camera_id(&id)?).await?,
    ))
}

/// `GET /cameras/{id}/password`: owner only.
pub async fn camera_password_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<CameraPasswordResponse>> {
    Ok(Json(
        cameras::camera_password(&state, user.user_id()?, camera_id(&id)?).await?,
    ))
}

/// `GET /cameras/{id}/setup`
pub async fn get_camera_setup_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<CameraSetupResponse>> {
    Ok(Json(
        camera_setup::get_setup(&state, user.user_id()?, camera_id(&id)?).await?,
    ))
}

/// `PUT /cameras/{id}/setup`: owner only. Creates or replaces the record.
pub async fn put_camera_setup_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    AppJson(body): AppJson<CameraSetupRequest>,
) -> AppResult<Json<CameraSetupResponse>> {
    Ok(Json(
        camera_setup::put_setup(&state, user.user_id()?, camera_id(&id)?, &body).await?,
    ))
}

/// `DELETE /cameras/{id}/setup`: owner only.
pub async fn delete_camera_setup_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    camera_setup::delete_setup(&state, user.user_id()?, camera_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
