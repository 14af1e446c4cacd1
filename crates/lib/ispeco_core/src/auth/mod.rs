//! Authentication primitives.
//!
//! Password hashing, JWT management, refresh-token hashing and the user
//! queries shared by the API and the CLI.

pub mod jwt;
pub mod password;
pub mod queries;
pub mod tokens;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
