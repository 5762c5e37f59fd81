//! Per-recipient sealed-box wrapping of session keys.
//!
//! The session key is encrypted once per recipient under a key-encryption
//! key (KEK) derived from an ephemeral X25519 exchange:
//!
//! ```text
//! wrap:    ephemeral ← X25519.generate()
//!          shared    ← ECDH(ephemeral_private, recipient_public)
//!          kek       ← HKDF-SHA256(ikm=shared, salt=ephemeral_public, info=WRAP_INFO)
//!          blob      ← ephemeral_public(32) || nonce(12) || AES-256-GCM(kek, session_key)
//!
//! unwrap:  shared    ← ECDH(recipient_private, blob.ephemeral_public)
//!          kek       ← same HKDF
//!          key       ← AES-256-GCM.open(kek, blob.nonce, blob.ciphertext)
//! ```
//!
//! Each blob is self-contained, so the wire payload can carry one opaque
//! string per recipient with no shared header.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::{aes_gcm_decrypt, aes_gcm_encrypt, generate_nonce, SessionKeyMaterial, NONCE_LEN, SESSION_KEY_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::keys::{Keypair, PrivateKey, PublicKey};

/// Domain separation context for KEK derivation.
const WRAP_INFO: &[u8] = b"sotto-session-key-wrap-v1";

/// Total length of a wrapped-key blob: ephemeral public key, nonce,
/// encrypted session key plus GCM tag.
pub const WRAPPED_KEY_LEN: usize = 32 + NONCE_LEN + SESSION_KEY_LEN + 16;

/// Derived key-encryption key, zeroized after use.
#[derive(Zeroize, ZeroizeOnDrop)]
struct WrapKey([u8; 32]);

fn derive_wrap_key(our_private: &PrivateKey, their_public: &PublicKey, salt: &PublicKey) -> WrapKey {
    let shared = our_private
        .to_x25519()
        .diffie_hellman(&their_public.to_x25519());

    let hkdf = Hkdf::<Sha256>::new(Some(salt.as_bytes()), shared.as_bytes());
    let mut kek = [0u8; 32];
    // Expand cannot fail for a 32-byte output
    hkdf.expand(WRAP_INFO, &mut kek)
        .expect("HKDF expand with 32-byte output");
    WrapKey(kek)
}

/// Wrap a session key for one recipient.
///
/// Generates a fresh ephemeral keypair per call; the ephemeral public key
/// is embedded in the returned blob.
pub fn wrap_session_key(
    session_key: &SessionKeyMaterial,
    recipient: &PublicKey,
) -> CryptoResult<Vec<u8>> {
    let ephemeral = Keypair::generate();
    let kek = derive_wrap_key(&ephemeral.private, recipient, &ephemeral.public);

    let nonce = generate_nonce();
    let wrapped = aes_gcm_encrypt(&kek.0, &nonce, session_key.as_bytes())?;

    let mut blob = Vec::with_capacity(WRAPPED_KEY_LEN);
    blob.extend_from_slice(ephemeral.public.as_bytes());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&wrapped);
    Ok(blob)
}

/// Unwrap a session key with the recipient's private key.
pub fn unwrap_session_key(blob: &[u8], private_key: &PrivateKey) -> CryptoResult<SessionKeyMaterial> {
    if blob.len() != WRAPPED_KEY_LEN {
        return Err(CryptoError::InvalidFormat(format!(
            "Wrapped key must be {} bytes, got {}",
            WRAPPED_KEY_LEN,
            blob.len()
        )));
    }

    let mut ephemeral_bytes = [0u8; 32];
    ephemeral_bytes.copy_from_slice(&blob[..32]);
    let ephemeral_public = PublicKey::from_bytes(ephemeral_bytes);

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&blob[32..32 + NONCE_LEN]);

    let kek = derive_wrap_key(private_key, &ephemeral_public, &ephemeral_public);

    let key_bytes = aes_gcm_decrypt(&kek.0, &nonce, &blob[32 + NONCE_LEN..])
        .map_err(|_| CryptoError::Decryption("Failed to unwrap session key".into()))?;

    SessionKeyMaterial::from_slice(&key_bytes)
}
