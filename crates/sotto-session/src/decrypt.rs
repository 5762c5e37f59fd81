//! Multi-candidate message decryption with plaintext caching.
//!
//! A message may have been encrypted against either the scoped key pair
//! or the pre-migration legacy pair, so decryption tries every locally
//! available private key, scoped first. The two typed states pass
//! through untouched: "never encrypted for me" propagates immediately
//! (another key cannot fix it), and "no stored key pair at all" fails
//! fast before any cryptography. Everything else is reported to the
//! error sink and normalized to a generic decryption failure.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;

use sotto_core::{
    scoped_key_pair_id, CancelToken, EncryptedMessage, Error, ErrorReporter, KeyStore, Result,
    StoredKeyPair, LEGACY_KEY_PAIR_ID,
};
use sotto_crypto::CryptoError;

use crate::cache::PlaintextCache;
use crate::config::SessionConfig;

/// Per-session decryption engine.
///
/// Owns the session's plaintext cache; constructed once per
/// authenticated session and dropped on sign-out.
pub struct MessageDecrypter {
    store: Arc<dyn KeyStore>,
    reporter: Arc<dyn ErrorReporter>,
    cache: Mutex<PlaintextCache>,
}

impl MessageDecrypter {
    /// Create a decrypter over the local key store.
    pub fn new(
        store: Arc<dyn KeyStore>,
        reporter: Arc<dyn ErrorReporter>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            store,
            reporter,
            cache: Mutex::new(PlaintextCache::new(config.cache_capacity)),
        }
    }

    /// Decrypt a message record for `user_id`, consulting the cache.
    ///
    /// A cancelled request still returns its plaintext but does not
    /// write it anywhere: the unit of work that asked is gone.
    pub async fn decrypt(
        &self,
        message: &EncryptedMessage,
        user_id: &str,
        cancel: &CancelToken,
    ) -> Result<String> {
        if let Some(hit) = self.cache.lock().await.get(user_id, &message.ciphertext) {
            return Ok(hit);
        }

        let plaintext = self
            .decrypt_with_stored_keys(
                &message.ciphertext,
                &message.encrypted_session_key,
                &message.iv,
                user_id,
            )
            .await?;

        if cancel.is_cancelled() {
            debug!(user_id, "Request superseded, discarding decryption result");
        } else {
            self.cache
                .lock()
                .await
                .put(user_id, &message.ciphertext, plaintext.clone());
        }

        Ok(plaintext)
    }

    /// Try every locally available key pair for `user_id`.
    ///
    /// Candidates are the scoped pair and, when distinct, the legacy
    /// unscoped pair, in that order.
    pub async fn decrypt_with_stored_keys(
        &self,
        ciphertext: &str,
        encrypted_session_key: &str,
        iv: &str,
        user_id: &str,
    ) -> Result<String> {
        let scoped_id = scoped_key_pair_id(user_id);

        let mut candidates = Vec::with_capacity(2);
        if let Some(pair) = self.store.get(&scoped_id).await? {
            candidates.push(pair);
        }
        if scoped_id != LEGACY_KEY_PAIR_ID {
            if let Some(pair) = self.store.get(LEGACY_KEY_PAIR_ID).await? {
                candidates.push(pair);
            }
        }

        if candidates.is_empty() {
            return Err(Error::StoredKeyPairNotFound(user_id.to_owned()));
        }

        let mut last_err = None;
        for pair in &candidates {
            match self.decrypt_once(ciphertext, encrypted_session_key, iv, pair, user_id) {
                Ok(plaintext) => return Ok(plaintext),
                // Not a wrong-key problem; no other candidate can help
                Err(err @ Error::SessionKeyNotFound(_)) => return Err(err),
                Err(err) => {
                    debug!(user_id, key_id = %pair.id, "Candidate key pair failed to decrypt");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::Decryption("No candidate key pair succeeded".into())))
    }

    /// One decryption attempt with one key pair. Reports and normalizes
    /// every failure except the not-for-me state.
    fn decrypt_once(
        &self,
        ciphertext: &str,
        encrypted_session_key: &str,
        iv: &str,
        pair: &StoredKeyPair,
        user_id: &str,
    ) -> Result<String> {
        sotto_crypto::decrypt_message(
            ciphertext,
            encrypted_session_key,
            iv,
            &pair.private_key,
            user_id,
        )
        .map_err(|e| match e {
            CryptoError::SessionKeyNotFound { user_id } => Error::SessionKeyNotFound(user_id),
            other => {
                let err = Error::Decryption(other.to_string());
                self.reporter.report(
                    "message_decrypt",
                    &err,
                    json!({ "user_id": user_id, "key_id": pair.id }),
                );
                err
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_store::MemoryKeyStore;
    use crate::seal::seal_message;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingReporter {
        contexts: StdMutex<Vec<String>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, context: &str, _error: &Error, _fields: serde_json::Value) {
            self.contexts.lock().unwrap().push(context.to_owned());
        }
    }

    async fn decrypter_for(
        pairs: Vec<StoredKeyPair>,
    ) -> (MessageDecrypter, Arc<MemoryKeyStore>, Arc<RecordingReporter>) {
        let store = Arc::new(MemoryKeyStore::new());
        for pair in pairs {
            store.put(pair).await.unwrap();
        }
        let reporter = Arc::new(RecordingReporter::default());
        let decrypter = MessageDecrypter::new(
            store.clone(),
            reporter.clone(),
            &SessionConfig::default(),
        );
        (decrypter, store, reporter)
    }

    #[tokio::test]
    async fn test_decrypts_with_scoped_key() {
        let pair = StoredKeyPair::generate(scoped_key_pair_id("alice"));
        let message = seal_message(
            "hello",
            &[("alice".to_string(), pair.public_key.clone())],
        )
        .unwrap();

        let (decrypter, _, reporter) = decrypter_for(vec![pair]).await;
        let plaintext = decrypter
            .decrypt(&message, "alice", &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(plaintext, "hello");
        assert!(reporter.contexts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_legacy_key() {
        // The message was wrapped against the legacy key, but a newer
        // scoped pair with different material exists locally.
        let legacy = StoredKeyPair::generate(LEGACY_KEY_PAIR_ID);
        let unrelated_scoped = StoredKeyPair::generate(scoped_key_pair_id("alice"));
        let message = seal_message(
            "old times",
            &[("alice".to_string(), legacy.public_key.clone())],
        )
        .unwrap();

        let (decrypter, _, reporter) = decrypter_for(vec![unrelated_scoped, legacy]).await;
        let plaintext = decrypter
            .decrypt(&message, "alice", &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(plaintext, "old times");
        // The scoped candidate's failure was reported before the legacy
        // key succeeded
        assert_eq!(
            reporter.contexts.lock().unwrap().as_slice(),
            ["message_decrypt"]
        );
    }

    #[tokio::test]
    async fn test_not_for_me_propagates_without_retry_or_report() {
        let scoped = StoredKeyPair::generate(scoped_key_pair_id("carol"));
        let legacy = StoredKeyPair::generate(LEGACY_KEY_PAIR_ID);
        let other = sotto_crypto::Keypair::generate();
        let message = seal_message("hello", &[("bob".to_string(), other.public)]).unwrap();

        let (decrypter, _, reporter) = decrypter_for(vec![scoped, legacy]).await;
        let err = decrypter
            .decrypt(&message, "carol", &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SessionKeyNotFound(ref u) if u == "carol"));
        // Not-for-me is not a system fault
        assert!(reporter.contexts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_stored_keys_fails_fast() {
        let other = sotto_crypto::Keypair::generate();
        let message = seal_message("hello", &[("alice".to_string(), other.public)]).unwrap();

        let (decrypter, _, reporter) = decrypter_for(vec![]).await;
        let err = decrypter
            .decrypt(&message, "alice", &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::StoredKeyPairNotFound(ref u) if u == "alice"));
        assert!(reporter.contexts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_candidates_failing_yields_last_error() {
        let scoped = StoredKeyPair::generate(scoped_key_pair_id("alice"));
        let legacy = StoredKeyPair::generate(LEGACY_KEY_PAIR_ID);
        // Wrapped for "alice" but against a key nobody here holds
        let other = sotto_crypto::Keypair::generate();
        let message = seal_message("hello", &[("alice".to_string(), other.public)]).unwrap();

        let (decrypter, _, reporter) = decrypter_for(vec![scoped, legacy]).await;
        let err = decrypter
            .decrypt(&message, "alice", &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Decryption(_)));
        // Both candidates were attempted and reported
        assert_eq!(reporter.contexts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cache_serves_after_keys_are_gone() {
        let pair = StoredKeyPair::generate(scoped_key_pair_id("alice"));
        let message = seal_message(
            "cached",
            &[("alice".to_string(), pair.public_key.clone())],
        )
        .unwrap();

        let (decrypter, store, _) = decrypter_for(vec![pair]).await;
        decrypter
            .decrypt(&message, "alice", &CancelToken::new())
            .await
            .unwrap();

        // Losing the keys no longer matters for cached content
        store.delete("key-pair:alice").await.unwrap();
        let plaintext = decrypter
            .decrypt(&message, "alice", &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(plaintext, "cached");
    }

    #[tokio::test]
    async fn test_cancelled_request_skips_cache_write() {
        let pair = StoredKeyPair::generate(scoped_key_pair_id("alice"));
        let message = seal_message(
            "volatile",
            &[("alice".to_string(), pair.public_key.clone())],
        )
        .unwrap();

        let (decrypter, store, _) = decrypter_for(vec![pair]).await;

        let cancel = CancelToken::new();
        cancel.cancel();
        // The in-flight decryption completes and returns...
        let plaintext = decrypter.decrypt(&message, "alice", &cancel).await.unwrap();
        assert_eq!(plaintext, "volatile");

        // ...but nothing was cached: without keys the next attempt fails
        store.delete("key-pair:alice").await.unwrap();
        let err = decrypter
            .decrypt(&message, "alice", &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StoredKeyPairNotFound(_)));
    }

    #[tokio::test]
    async fn test_identity_switch_clears_cached_plaintext() {
        let alice = StoredKeyPair::generate(scoped_key_pair_id("alice"));
        let message = seal_message(
            "secret",
            &[("alice".to_string(), alice.public_key.clone())],
        )
        .unwrap();

        let (decrypter, store, _) = decrypter_for(vec![alice]).await;
        decrypter
            .decrypt(&message, "alice", &CancelToken::new())
            .await
            .unwrap();

        // bob has no keys; if alice's cache entry leaked across the
        // identity switch this would return her plaintext
        store.delete("key-pair:alice").await.unwrap();
        let err = decrypter
            .decrypt(&message, "bob", &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StoredKeyPairNotFound(_)));
    }
}
