//! Multi-recipient message sealing.
//!
//! The crypto engine wraps the session key for one recipient at a time;
//! this composes it over a whole chat's membership and assembles the
//! wire record.

use std::collections::BTreeMap;

use sotto_core::{EncryptedMessage, Error, Result};
use sotto_crypto::{encrypt_message, encrypt_session_key_for, PublicKey, SessionKeyEnvelope};

/// Encrypt `plaintext` for every listed participant.
///
/// The recipient set must cover every chat participant *including the
/// sender's own device* (for self-read-back); anyone omitted here can
/// never decrypt the message. Duplicate user ids collapse to one entry.
pub fn seal_message(
    plaintext: &str,
    recipients: &[(String, PublicKey)],
) -> Result<EncryptedMessage> {
    if recipients.is_empty() {
        return Err(Error::InvalidInput(
            "At least one recipient required".into(),
        ));
    }

    let content = encrypt_message(plaintext)?;

    let mut wrapped = BTreeMap::new();
    for (user_id, public_key) in recipients {
        wrapped.insert(
            user_id.clone(),
            encrypt_session_key_for(&content.session_key, public_key)?,
        );
    }

    let encrypted_session_key = SessionKeyEnvelope::encode(&wrapped)?;

    Ok(EncryptedMessage {
        ciphertext: content.ciphertext,
        iv: content.iv,
        encrypted_session_key,
        recipient_ids: wrapped.into_keys().collect(),
    })
}
