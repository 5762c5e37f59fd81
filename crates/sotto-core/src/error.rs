//! Session-level error taxonomy.
//!
//! Two variants are typed states rather than faults and must survive the
//! multi-candidate decryption loop unmodified: [`Error::SessionKeyNotFound`]
//! ("this message was never encrypted for me") and
//! [`Error::StoredKeyPairNotFound`] ("no usable private key exists here").
//! Every other decryption-path failure is normalized to
//! [`Error::Decryption`] before it leaves the engine.

use thiserror::Error;

use sotto_crypto::CryptoError;

/// Result type alias using sotto's session error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for session operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The message was never encrypted for this identity.
    #[error("No wrapped session key for user {0}")]
    SessionKeyNotFound(String),

    /// No key pair is stored locally for this identity.
    #[error("No stored key pair for user {0}")]
    StoredKeyPairNotFound(String),

    /// Generic decryption failure - wrong key, tampering, malformed data.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Key bootstrap failed; reported and swallowed by the lifecycle
    /// manager, never propagated to its caller.
    #[error("Key bootstrap failed: {0}")]
    KeyBootstrap(String),

    /// Key store operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Placeholder text for rendering paths.
    ///
    /// Rendering never propagates a decryption failure; each state maps
    /// to a stable displayable string instead.
    pub fn display_placeholder(&self) -> &'static str {
        match self {
            Error::SessionKeyNotFound(_) => "Not encrypted for this device",
            Error::StoredKeyPairNotFound(_) => "Encryption key not found",
            _ => "Could not decrypt message",
        }
    }
}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::SessionKeyNotFound { user_id } => Error::SessionKeyNotFound(user_id),
            CryptoError::Encryption(msg) => Error::Encryption(msg),
            CryptoError::Decryption(msg) => Error::Decryption(msg),
            CryptoError::InvalidFormat(msg) => Error::Decryption(msg),
            CryptoError::InvalidInput(msg) => Error::InvalidInput(msg),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
