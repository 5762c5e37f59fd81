//! Per-message hybrid encryption and decryption.
//!
//! # Encryption flow
//!
//! 1. Generate a fresh session key and a fresh 12-byte nonce
//! 2. Encrypt the plaintext with AES-256-GCM
//! 3. Wrap the session key once per recipient ([`encrypt_session_key_for`])
//! 4. The caller assembles the per-recipient wraps into the
//!    `encryptedSessionKey` map ([`SessionKeyEnvelope::encode`])
//!
//! # Decryption flow
//!
//! 1. Decode the envelope; select this user's wrapped key (legacy blobs
//!    apply to everyone)
//! 2. Unwrap the session key with the private key
//! 3. Decrypt the ciphertext; a bad authentication tag surfaces as a
//!    decryption error
//!
//! The engine is single-recipient per wrap call; multi-recipient fan-out
//! belongs to the caller so that no chat participant is silently omitted.

use crate::aead::{aes_gcm_decrypt, aes_gcm_encrypt, generate_nonce, SessionKeyMaterial, NONCE_LEN};
use crate::encoding::{base64_decode, base64_encode};
use crate::envelope::SessionKeyEnvelope;
use crate::error::{CryptoError, CryptoResult};
use crate::keys::{PrivateKey, PublicKey};
use crate::wrap::{unwrap_session_key, wrap_session_key};

/// Output of [`encrypt_message`]: the wire fields plus the still-unwrapped
/// session key for per-recipient fan-out.
#[derive(Debug)]
pub struct EncryptedContent {
    /// Base64 AES-256-GCM ciphertext (tag appended).
    pub ciphertext: String,
    /// Base64 12-byte nonce.
    pub iv: String,
    /// Raw session key, to be wrapped for each recipient and then dropped.
    pub session_key: SessionKeyMaterial,
}

/// Encrypt one message under a fresh session key and nonce.
pub fn encrypt_message(plaintext: &str) -> CryptoResult<EncryptedContent> {
    let session_key = SessionKeyMaterial::generate();
    let nonce = generate_nonce();

    let ciphertext = aes_gcm_encrypt(session_key.as_bytes(), &nonce, plaintext.as_bytes())?;

    Ok(EncryptedContent {
        ciphertext: base64_encode(&ciphertext),
        iv: base64_encode(&nonce),
        session_key,
    })
}

/// Wrap a message's session key for one recipient.
///
/// Returns the base64 blob that becomes this recipient's entry in the
/// `encryptedSessionKey` map.
pub fn encrypt_session_key_for(
    session_key: &SessionKeyMaterial,
    recipient: &PublicKey,
) -> CryptoResult<String> {
    Ok(base64_encode(&wrap_session_key(session_key, recipient)?))
}

/// Decrypt one message with one private key on behalf of `user_id`.
///
/// Fails with [`CryptoError::SessionKeyNotFound`] when the multi-recipient
/// map has no entry for `user_id`; every other failure means a wrong key,
/// tampering, or a malformed payload.
pub fn decrypt_message(
    ciphertext: &str,
    encrypted_session_key: &str,
    iv: &str,
    private_key: &PrivateKey,
    user_id: &str,
) -> CryptoResult<String> {
    let envelope = SessionKeyEnvelope::decode(encrypted_session_key);
    let wrapped_b64 = envelope.wrapped_key_for(user_id)?;

    let wrapped = base64_decode(wrapped_b64)?;
    let session_key = unwrap_session_key(&wrapped, private_key)?;

    let nonce_bytes = base64_decode(iv)?;
    let nonce: [u8; NONCE_LEN] = nonce_bytes.try_into().map_err(|_| {
        CryptoError::InvalidFormat(format!("IV must be {} bytes", NONCE_LEN))
    })?;

    let content = base64_decode(ciphertext)?;
    let plaintext = aes_gcm_decrypt(session_key.as_bytes(), &nonce, &content)?;

    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::Decryption("Plaintext is not valid UTF-8".into()))
}
