//! Request handlers.

pub mod auth;
pub mod cameras;
pub mod health;
pub mod live_stream;
pub mod user_access;
pub mod users;
