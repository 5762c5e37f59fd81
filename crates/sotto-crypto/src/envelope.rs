//! Wire codec for the per-message `encryptedSessionKey` field.
//!
//! Two generations of the field exist in stored history:
//!
//! - **Multi-recipient** (current): base64 of a UTF-8 JSON object mapping
//!   recipient user id to that recipient's base64 wrapped session key.
//! - **Legacy single** (pre-multi-recipient): the field itself is one
//!   opaque wrapped-key blob, applicable regardless of who asks.
//!
//! Decoding is total: anything that fails the structural checks for the
//! map form is classified as a legacy blob, never an error. The checks
//! are base64 decode, UTF-8, a minimum decoded length, JSON object with
//! at least one entry, and all-string values.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::encoding::{base64_decode, base64_encode};
use crate::error::{CryptoError, CryptoResult};

/// Minimum decoded length for a plausible JSON map.
///
/// Inherited heuristic: a shorter decoded value is treated as a legacy
/// blob even if it happens to parse as JSON.
pub const MIN_MAP_JSON_LEN: usize = 8;

/// Decoded form of the `encryptedSessionKey` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKeyEnvelope {
    /// One wrapped session key per recipient user id.
    MultiRecipient(BTreeMap<String, String>),
    /// A single opaque wrapped key from the pre-multi-recipient format.
    LegacySingle(String),
}

impl SessionKeyEnvelope {
    /// Classify and decode a raw `encryptedSessionKey` value.
    ///
    /// Never fails; structural violations fall back to `LegacySingle`
    /// carrying the raw value verbatim.
    pub fn decode(raw: &str) -> Self {
        let legacy = || SessionKeyEnvelope::LegacySingle(raw.to_owned());

        let Ok(bytes) = base64_decode(raw) else {
            return legacy();
        };
        let Ok(text) = String::from_utf8(bytes) else {
            return legacy();
        };
        if text.len() < MIN_MAP_JSON_LEN {
            return legacy();
        }
        let Ok(Value::Object(entries)) = serde_json::from_str::<Value>(&text) else {
            return legacy();
        };
        if entries.is_empty() {
            return legacy();
        }

        let mut map = BTreeMap::new();
        for (user_id, wrapped) in entries {
            match wrapped {
                Value::String(s) => {
                    map.insert(user_id, s);
                }
                _ => return legacy(),
            }
        }
        SessionKeyEnvelope::MultiRecipient(map)
    }

    /// Encode a multi-recipient map into the wire representation.
    pub fn encode(map: &BTreeMap<String, String>) -> CryptoResult<String> {
        if map.is_empty() {
            return Err(CryptoError::InvalidInput(
                "At least one recipient required".into(),
            ));
        }
        let json = serde_json::to_string(map)
            .map_err(|e| CryptoError::InvalidFormat(format!("Failed to encode key map: {}", e)))?;
        Ok(base64_encode(json.as_bytes()))
    }

    /// Select the wrapped key for `user_id`.
    ///
    /// For the legacy form the single blob applies to everyone. For the
    /// map form a missing entry means the message was never encrypted
    /// for this identity.
    pub fn wrapped_key_for(&self, user_id: &str) -> CryptoResult<&str> {
        match self {
            SessionKeyEnvelope::LegacySingle(blob) => Ok(blob),
            SessionKeyEnvelope::MultiRecipient(map) => map
                .get(user_id)
                .map(String::as_str)
                .ok_or_else(|| CryptoError::SessionKeyNotFound {
                    user_id: user_id.to_owned(),
                }),
        }
    }

    /// Recipient ids of the map form, without decrypting anything.
    ///
    /// Legacy blobs carry no recipient information.
    pub fn recipient_ids(&self) -> Option<Vec<&str>> {
        match self {
            SessionKeyEnvelope::MultiRecipient(map) => {
                Some(map.keys().map(String::as_str).collect())
            }
            SessionKeyEnvelope::LegacySingle(_) => None,
        }
    }
}
