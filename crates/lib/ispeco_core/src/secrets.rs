//! AES-256-GCM encryption for camera connection secrets.
//!
//! Camera stream URLs and passwords are stored as raw `nonce || ciphertext
//! || tag` bytes in BYTEA columns. The key is derived once from a single
//! process-wide passphrase and injected wherever encryption is needed.
//!
//! There is no key versioning: rows written under a previous key fail to
//! decrypt after the passphrase changes.

use std::fmt;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Environment variable holding the encryption passphrase.
pub const ENCRYPTION_KEY_ENV: &str = "CAMERA_ENCRYPTION_KEY";

/// Nonce size for AES-256-GCM (12 bytes).
const NONCE_SIZE: usize = 12;
/// AES-256 key size (32 bytes).
const KEY_SIZE: usize = 32;
/// GCM tag size (16 bytes).
const TAG_SIZE: usize = 16;

/// Codec errors. Messages never include key material, plaintext or ciphertext.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("encryption key is not configured")]
    KeyMissing,

    #[error("decryption failed")]
    DecryptionFailure,

    #[error("encryption failed")]
    EncryptionFailure,
}

/// Symmetric codec for camera credentials.
#[derive(Clone)]
pub struct SecretCodec {
    cipher: Aes256Gcm,
}

impl SecretCodec {
    /// Build a codec from a passphrase. Empty or whitespace-only passphrases
    /// count as missing.
    pub fn new(passphrase: &str) -> Result<Self, CodecError> {
        if passphrase.trim().is_empty() {
            return Err(CodecError::KeyMissing);
        }
        let key = derive_key(passphrase);
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CodecError::KeyMissing)?;
        Ok(Self { cipher })
    }

    /// Build a codec from an optional configured passphrase.
    pub fn from_config(passphrase: Option<&str>) -> Result<Self, CodecError> {
        Self::new(passphrase.ok_or(CodecError::KeyMissing)?)
    }

    /// Read the passphrase from `CAMERA_ENCRYPTION_KEY`.
    pub fn from_env() -> Result<Self, CodecError> {
        let key = std::env::var(ENCRYPTION_KEY_ENV).map_err(|_| CodecError::KeyMissing)?;
        Self::new(&key)
    }

    /// Encrypt plaintext. Returns `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, CodecError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CodecError::EncryptionFailure)?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(combined)
    }

    /// Decrypt `nonce || ciphertext || tag` back into the original string.
    pub fn decrypt(&self, combined: &[u8]) -> Result<String, CodecError> {
        if combined.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CodecError::DecryptionFailure);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CodecError::DecryptionFailure)?;

        String::from_utf8(plaintext).map_err(|_| CodecError::DecryptionFailure)
    }
}

impl fmt::Debug for SecretCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretCodec { key: <redacted> }")
    }
}

/// Derive a 32-byte key from a passphrase using SHA-256.
fn derive_key(passphrase: &str) -> [u8; KEY_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(passphrase.as_bytes());
    let result = hasher.finalize();
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&result);
    key
}
