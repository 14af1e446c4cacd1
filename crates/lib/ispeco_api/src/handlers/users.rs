//! Profile handlers for the authenticated user.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ChangePasswordRequest, UpdateProfileRequest, UserResponse};
use crate::services::users;

/// `GET /users/me`
pub async fn get_me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(users::get_profile(&state.pool, user.user_id()?).await?))
}

/// `PATCH /users/me`
pub async fn update_me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(body): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(
        users::update_profile(&state.pool, user.user_id()?, body).await?,
    ))
}

/// `POST /users/me/password`: change password; ends all other sessions.
pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(body): AppJson<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    users::change_password(&state.pool, user.user_id()?, &body).await?;
    Ok(StatusCode::NO_CONTENT)
}
