//! Application error types.

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ispeco_core::access::AccessError;
use ispeco_core::auth::AuthError;
use ispeco_core::models::InvalidChoice;
use ispeco_core::secrets::CodecError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Field name to validation messages.
pub type FieldMessages = BTreeMap<String, Vec<String>>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid fields: {0:?}")]
    InvalidFields(FieldMessages),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database unavailable: {0}")]
    DbUnavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// A single field-level validation error.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldMessages::new();
        fields.insert(name.to_string(), vec![message.into()]);
        AppError::InvalidFields(fields)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut fields = None;
        let (status, error, message) = match self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m),
            AppError::InvalidFields(f) => {
                fields = Some(f);
                (
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    "Invalid input".to_string(),
                )
            }
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m),
            AppError::DbUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, "db_unavailable", m),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m),
            AppError::Internal(detail) => {
                error!(%detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
            fields,
        });
        (status, body).into_response()
    }
}

/// Name of the field serde reported as missing, if that is the failure.
fn missing_field(detail: &str) -> Option<&str> {
    let rest = detail.split_once("missing field `")?.1;
    rest.split_once('`').map(|(name, _)| name)
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        if let JsonRejection::JsonDataError(_) = rejection
            && let Some(name) = missing_field(&detail)
        {
            return AppError::field(name, "This field is required.");
        }
        AppError::Validation(detail)
    }
}

/// Collects field-level validation errors for one request.
#[derive(Debug, Default)]
pub struct FieldErrors(FieldMessages);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Parse a required choice, recording a message on failure.
    pub fn choice<T>(&mut self, field: &str, value: &str) -> Option<T>
    where
        T: FromStr<Err = InvalidChoice>,
    {
        match value.parse() {
            Ok(v) => Some(v),
            Err(e) => {
                self.add(field, e.to_string());
                None
            }
        }
    }

    /// Parse an optional choice. An absent value is not an error.
    pub fn optional_choice<T>(&mut self, field: &str, value: Option<&str>) -> Option<T>
    where
        T: FromStr<Err = InvalidChoice>,
    {
        value.and_then(|v| self.choice(field, v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok` if nothing was recorded.
    pub fn finish(self) -> AppResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidFields(self.0))
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::InvalidFields(errors.0)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".into()),
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => AppError::DbUnavailable(e.to_string()),
            _ => AppError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::TokenError(msg) => AppError::Unauthorized(msg),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::DuplicateEmail => AppError::Conflict("Email address already exists.".into()),
            AuthError::DbError(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<AccessError> for AppError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::NotFound(msg) => AppError::NotFound(msg),
            AccessError::Forbidden(msg) => AppError::Forbidden(msg),
            AccessError::UnknownGrantee(_) => {
                AppError::field("email", "No user is registered with this email.")
            }
            AccessError::SelfGrant => AppError::field("email", "You cannot grant access to yourself."),
            AccessError::DuplicateGrant => {
                AppError::Conflict("Access has already been granted to this user.".into())
            }
            AccessError::InvalidChoice { field, source } => AppError::field(field, source.to_string()),
            AccessError::DbError(e) => AppError::from(e),
        }
    }
}

impl From<CodecError> for AppError {
    fn from(e: CodecError) -> Self {
        AppError::Internal(format!("camera credential codec: {e}"))
    }
}
