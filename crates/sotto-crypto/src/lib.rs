//! # sotto-crypto
//!
//! Hybrid end-to-end encryption engine for sotto messaging.
//!
//! Message content is encrypted once under a one-shot symmetric session
//! key; the session key is then wrapped individually for every recipient
//! under their long-lived public key. The transport and storage layers
//! only ever see ciphertext, nonces, and wrapped keys.
//!
//! ## Cryptographic primitives
//!
//! - **Key exchange**: X25519 (ephemeral, per wrapped key)
//! - **Key derivation**: HKDF-SHA256 with domain separation
//! - **Symmetric cipher**: AES-256-GCM (AEAD, 12-byte nonce)
//! - **Random generation**: OS-seeded CSPRNG
//!
//! This is a classical hybrid public-key scheme; it is not post-quantum
//! secure.
//!
//! ## Wire shape
//!
//! A message record carries three base64 fields: `ciphertext`, `iv`, and
//! `encryptedSessionKey`. The last one is either a JSON map of recipient
//! user id to wrapped key (current) or a single bare wrapped key
//! (legacy); [`SessionKeyEnvelope`] models the distinction explicitly.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use sotto_crypto::{
//!     decrypt_message, encrypt_message, encrypt_session_key_for, Keypair, SessionKeyEnvelope,
//! };
//!
//! let alice = Keypair::generate();
//! let bob = Keypair::generate();
//!
//! // Sender side: one ciphertext, one wrapped key per recipient.
//! let content = encrypt_message("hello").unwrap();
//! let mut map = BTreeMap::new();
//! map.insert(
//!     "alice".to_string(),
//!     encrypt_session_key_for(&content.session_key, &alice.public).unwrap(),
//! );
//! map.insert(
//!     "bob".to_string(),
//!     encrypt_session_key_for(&content.session_key, &bob.public).unwrap(),
//! );
//! let encrypted_session_key = SessionKeyEnvelope::encode(&map).unwrap();
//!
//! // Recipient side.
//! let plaintext = decrypt_message(
//!     &content.ciphertext,
//!     &encrypted_session_key,
//!     &content.iv,
//!     &bob.private,
//!     "bob",
//! )
//! .unwrap();
//! assert_eq!(plaintext, "hello");
//! ```

pub mod aead;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod hybrid;
pub mod keys;
pub mod wrap;

// Re-export commonly used types
pub use aead::{generate_nonce, SessionKeyMaterial, NONCE_LEN, SESSION_KEY_LEN};
pub use encoding::{base64_decode, base64_encode};
pub use envelope::{SessionKeyEnvelope, MIN_MAP_JSON_LEN};
pub use error::{CryptoError, CryptoResult};
pub use hybrid::{decrypt_message, encrypt_message, encrypt_session_key_for, EncryptedContent};
pub use keys::{Keypair, PrivateKey, PublicKey};
pub use wrap::{unwrap_session_key, wrap_session_key, WRAPPED_KEY_LEN};
