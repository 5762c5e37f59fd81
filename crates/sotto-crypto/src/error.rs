//! Error types for the encryption engine.

use thiserror::Error;

/// Errors raised by the hybrid encryption and decryption engines.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The wrapped-key map has no entry for this user.
    ///
    /// The message exists but was never encrypted for this identity.
    /// This is not a fault and must never be retried with another key.
    #[error("No wrapped session key for user {user_id}")]
    SessionKeyNotFound {
        /// The identity that requested decryption.
        user_id: String,
    },

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed - wrong key or tampered data.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Malformed wire field (bad base64, wrong length, truncated blob).
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Invalid caller input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CryptoError {
    /// Whether this is the "message was never encrypted for me" case.
    pub fn is_not_for_me(&self) -> bool {
        matches!(self, CryptoError::SessionKeyNotFound { .. })
    }
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_not_found_display() {
        let err = CryptoError::SessionKeyNotFound {
            user_id: "alice".into(),
        };
        assert!(err.to_string().contains("alice"));
        assert!(err.is_not_for_me());
    }

    #[test]
    fn test_decryption_is_not_not_for_me() {
        let err = CryptoError::Decryption("bad tag".into());
        assert!(!err.is_not_for_me());
    }
}
