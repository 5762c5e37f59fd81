//! Domain models: stored key pairs and the encrypted wire record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sotto_crypto::{Keypair, PrivateKey, PublicKey};

/// Storage id of the pre-scoped key pair scheme.
///
/// Earlier releases stored a single key pair under this fixed id with no
/// user scoping. The lifecycle manager migrates it to a scoped id on
/// first sight.
pub const LEGACY_KEY_PAIR_ID: &str = "key-pair";

/// Prefix of user-scoped key pair ids.
pub const SCOPED_KEY_PAIR_PREFIX: &str = "key-pair:";

/// Storage id of the key pair scoped to `user_id`.
pub fn scoped_key_pair_id(user_id: &str) -> String {
    format!("{}{}", SCOPED_KEY_PAIR_PREFIX, user_id)
}

/// A key pair as persisted in the local key store.
///
/// At most one record exists per id. The private key never leaves the
/// device; it is serialized only into the local store.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredKeyPair {
    /// Storage id: [`LEGACY_KEY_PAIR_ID`] or `key-pair:<userId>`.
    pub id: String,
    /// The published half.
    pub public_key: PublicKey,
    /// The device-local half.
    pub private_key: PrivateKey,
    /// When the key material was first generated.
    pub created_at: DateTime<Utc>,
}

impl StoredKeyPair {
    /// Generate fresh key material under the given storage id.
    pub fn generate(id: impl Into<String>) -> Self {
        let keypair = Keypair::generate();
        Self {
            id: id.into(),
            public_key: keypair.public,
            private_key: keypair.private,
            created_at: Utc::now(),
        }
    }

    /// The same key material re-keyed under a new storage id.
    ///
    /// Used by migration; the creation timestamp travels with the
    /// material, not the record.
    pub fn rekeyed_as(&self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            public_key: self.public_key.clone(),
            private_key: self.private_key.clone(),
            created_at: self.created_at,
        }
    }

    /// Base64 export of the public key - the published representation.
    pub fn exported_public_key(&self) -> String {
        self.public_key.to_base64()
    }
}

impl std::fmt::Debug for StoredKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredKeyPair")
            .field("id", &self.id)
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// One encrypted message record as delivered by the sync layer.
///
/// Field names round-trip the external camelCase wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedMessage {
    /// Base64 AES-256-GCM ciphertext.
    pub ciphertext: String,
    /// Base64 12-byte nonce.
    pub iv: String,
    /// Multi-recipient wrapped-key map, or a legacy single blob.
    pub encrypted_session_key: String,
    /// Participants the sender wrapped the session key for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipient_ids: Vec<String>,
}
