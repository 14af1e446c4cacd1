//! Camera registry.
//!
//! Rows only ever hold ciphertext for connection secrets; callers encrypt
//! with [`crate::secrets::SecretCodec`] before handing values to
//! [`queries`].

pub mod queries;
