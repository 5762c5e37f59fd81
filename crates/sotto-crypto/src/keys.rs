//! X25519 identity keypairs for message encryption.
//!
//! Every participant holds a long-lived device-local keypair. The public
//! half is exported as base64 and published to the user directory so
//! senders can wrap session keys for it; the private half never leaves
//! the device and is zeroized when dropped.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::encoding::{base64_decode, base64_encode};
use crate::error::{CryptoError, CryptoResult};

/// X25519 public key (32 bytes).
///
/// Freely shareable. Senders use it to wrap a per-message session key
/// that only the matching private key can unwrap.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Create a public key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of the public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Export as base64 - the published-directory representation.
    pub fn to_base64(&self) -> String {
        base64_encode(&self.0)
    }

    /// Parse a base64 export back into a key.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = base64_decode(encoded)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidFormat("Public key must be 32 bytes".into()))?;
        Ok(Self(arr))
    }

    pub(crate) fn to_x25519(&self) -> X25519Public {
        X25519Public::from(self.0)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", &self.to_base64()[..8])
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

/// X25519 private key (32 bytes) with automatic zeroization.
///
/// Never exported or transmitted. Serde support exists solely so the
/// local key store can persist it; the wire models never carry it.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    /// Create a private key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of the private key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        let secret = self.to_x25519();
        let public = X25519Public::from(&secret);
        PublicKey(*public.as_bytes())
    }

    pub(crate) fn to_x25519(&self) -> StaticSecret {
        StaticSecret::from(self.0)
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl Serialize for PrivateKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&base64_encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = base64_decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid private key length"))?;
        Ok(Self(arr))
    }
}

/// X25519 keypair for public-key encryption.
pub struct Keypair {
    /// The public key (can be shared).
    pub public: PublicKey,
    /// The private key (must be kept secret).
    pub private: PrivateKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut secret_bytes = [0u8; 32];
        rng.fill_bytes(&mut secret_bytes);

        let secret = StaticSecret::from(secret_bytes);
        let public = X25519Public::from(&secret);
        secret_bytes.zeroize();

        Self {
            public: PublicKey(*public.as_bytes()),
            private: PrivateKey(secret.to_bytes()),
        }
    }

    /// Rebuild a keypair from an existing private key.
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { public, private }
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public)
            .field("private", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation_is_random() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::generate();

        assert_ne!(kp1.public.as_bytes(), kp2.public.as_bytes());
        assert_ne!(kp1.private.as_bytes(), kp2.private.as_bytes());
    }

    #[test]
    fn test_private_key_derives_public() {
        let kp = Keypair::generate();
        assert_eq!(kp.public.as_bytes(), kp.private.public_key().as_bytes());
    }

    #[test]
    fn test_base64_export_roundtrip() {
        let kp = Keypair::generate();
        let exported = kp.public.to_base64();
        let parsed = PublicKey::from_base64(&exported).unwrap();
        assert_eq!(kp.public, parsed);
    }

    #[test]
    fn test_from_base64_rejects_wrong_length() {
        let short = base64_encode(&[1u8; 16]);
        assert!(PublicKey::from_base64(&short).is_err());
    }

    #[test]
    fn test_keypair_from_private() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::from_private(kp1.private.clone());
        assert_eq!(kp1.public, kp2.public);
    }

    #[test]
    fn test_private_key_serde_roundtrip() {
        let kp = Keypair::generate();
        let json = serde_json::to_string(&kp.private).unwrap();
        let parsed: PrivateKey = serde_json::from_str(&json).unwrap();
        assert_eq!(kp.private.as_bytes(), parsed.as_bytes());
    }

    #[test]
    fn test_debug_output_redacts_private_key() {
        let kp = Keypair::generate();
        let debug = format!("{:?}", kp);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(&base64_encode(kp.private.as_bytes())));
    }
}
