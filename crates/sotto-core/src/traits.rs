//! Collaborator traits at the subsystem's seams.
//!
//! These interfaces decouple the encryption subsystem from the storage
//! engine, the user directory, and the error-reporting pipeline, and
//! make every component testable with in-memory doubles.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::StoredKeyPair;

/// Durable string-keyed storage of key pairs.
///
/// Pure storage with no cryptographic logic; implementations persist
/// across process restarts. Storage failures propagate as
/// [`Error::Storage`], uninterpreted by the crypto error taxonomy.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Fetch the key pair stored under `id`, if any.
    async fn get(&self, id: &str) -> Result<Option<StoredKeyPair>>;

    /// Store a key pair under its id, replacing any previous entry.
    async fn put(&self, pair: StoredKeyPair) -> Result<()>;

    /// Remove the entry under `id`. Not an error if absent.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// The published-public-key side of the user directory.
///
/// Collaborators fetch peers' public keys through the data-sync layer;
/// this trait covers only the mutation the lifecycle manager needs.
#[async_trait]
pub trait PublicKeyDirectory: Send + Sync {
    /// Publish (or replace) the base64 public key for `user_id`.
    async fn publish_public_key(&self, user_id: &str, public_key: &str) -> Result<()>;
}

/// Sink for failures that are handled rather than propagated.
pub trait ErrorReporter: Send + Sync {
    /// Report a handled failure with its context and structured fields.
    fn report(&self, context: &str, error: &Error, fields: serde_json::Value);
}

/// Default reporter: structured `tracing` error events.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, context: &str, error: &Error, fields: serde_json::Value) {
        tracing::error!(context, error = %error, fields = %fields, "Handled failure reported");
    }
}
