//! # ispeco_core
//!
//! Core domain logic for ISPECO.
//!
//! The interesting part of the crate is the credential-and-stream-access
//! broker: [`secrets`] encrypts camera credentials at rest, [`access`]
//! decides who may touch a camera, and [`stream`] gates a live relay
//! session on that decision.

pub mod access;
pub mod auth;
pub mod cameras;
pub mod migrate;
pub mod models;
pub mod secrets;
pub mod stream;
pub mod uuid;

#[cfg(test)]
pub(crate) mod test_support;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
