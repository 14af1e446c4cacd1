//! Business logic behind the handlers.

pub mod auth;
pub mod camera_setup;
pub mod cameras;
pub mod user_access;
pub mod users;
