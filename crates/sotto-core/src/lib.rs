//! # sotto-core
//!
//! Shared domain layer of the sotto end-to-end encryption subsystem:
//! the session error taxonomy, the stored-key and wire models, the
//! collaborator traits (key store, public-key directory, error
//! reporting), and the cooperative cancellation token.
//!
//! Cryptographic primitives live in `sotto-crypto`; the per-session
//! machinery (lifecycle manager, decrypter, plaintext cache) lives in
//! `sotto-session`.

pub mod cancel;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use models::{
    scoped_key_pair_id, EncryptedMessage, StoredKeyPair, LEGACY_KEY_PAIR_ID,
    SCOPED_KEY_PAIR_PREFIX,
};
pub use traits::{ErrorReporter, KeyStore, PublicKeyDirectory, TracingReporter};
