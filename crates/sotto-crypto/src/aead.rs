//! AES-256-GCM content encryption and the one-shot session key.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Session key length in bytes (AES-256).
pub const SESSION_KEY_LEN: usize = 32;

/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// One-shot symmetric key used to encrypt a single message.
///
/// Generated fresh per message, wrapped individually for each recipient,
/// and zeroized as soon as the encrypt or decrypt call finishes. Never
/// persisted or logged.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKeyMaterial([u8; SESSION_KEY_LEN]);

impl SessionKeyMaterial {
    /// Generate a fresh random session key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Import raw key material.
    pub fn from_bytes(bytes: [u8; SESSION_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Import raw key material from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; SESSION_KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidFormat(format!(
                "Session key must be {} bytes, got {}",
                SESSION_KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Raw key material, for wrapping.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeyMaterial")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random 12-byte GCM nonce.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Encrypt plaintext with AES-256-GCM.
///
/// Returns ciphertext with the 16-byte authentication tag appended.
pub fn aes_gcm_encrypt(
    key: &[u8; SESSION_KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Encryption(e.to_string()))?;

    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".into()))
}

/// Decrypt AES-256-GCM ciphertext (tag included).
///
/// Authentication failure means a wrong key or tampered data.
pub fn aes_gcm_decrypt(
    key: &[u8; SESSION_KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Decryption("Invalid key".into()))?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption("AES-GCM decryption failed".into()))
}
