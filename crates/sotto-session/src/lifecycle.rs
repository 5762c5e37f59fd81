//! Key pair bootstrap: generation, legacy migration, publish
//! reconciliation.
//!
//! The manager runs once per `(user id, server-published public key)`
//! observation and guarantees that afterwards a usable key pair exists
//! under the scoped storage id and that its public half is what the
//! directory publishes. It is safe to re-invoke at any time: a latch
//! rejects concurrent runs, and a run that changes nothing publishes
//! nothing.
//!
//! Failures are reported and swallowed; a user left without a key pair
//! is recovered by the next observation, never by crashing the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use sotto_core::{
    scoped_key_pair_id, CancelToken, Error, ErrorReporter, KeyStore, PublicKeyDirectory, Result,
    StoredKeyPair, LEGACY_KEY_PAIR_ID,
};

/// Ensures a usable, published key pair for the local user.
///
/// One instance belongs to one authenticated session; the in-progress
/// latch therefore guards exactly one user's bootstrap.
pub struct KeyLifecycleManager {
    store: Arc<dyn KeyStore>,
    directory: Arc<dyn PublicKeyDirectory>,
    reporter: Arc<dyn ErrorReporter>,
    in_progress: AtomicBool,
}

impl KeyLifecycleManager {
    /// Create a manager over the given collaborators.
    pub fn new(
        store: Arc<dyn KeyStore>,
        directory: Arc<dyn PublicKeyDirectory>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            store,
            directory,
            reporter,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Run the bootstrap for one observation.
    ///
    /// `published_public_key` is the directory's current value for this
    /// user, if any. Re-invocations while a run is in flight are skipped;
    /// errors are reported to the sink and swallowed.
    pub async fn ensure_keys(
        &self,
        user_id: &str,
        published_public_key: Option<&str>,
        cancel: &CancelToken,
    ) {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(user_id, "Key bootstrap already in progress, skipping");
            return;
        }

        let result = self.run(user_id, published_public_key, cancel).await;
        self.in_progress.store(false, Ordering::SeqCst);

        if let Err(e) = result {
            let err = Error::KeyBootstrap(e.to_string());
            self.reporter
                .report("key_lifecycle", &err, json!({ "user_id": user_id }));
        }
    }

    async fn run(
        &self,
        user_id: &str,
        published: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<()> {
        let scoped_id = scoped_key_pair_id(user_id);
        let mut scoped = self.store.get(&scoped_id).await?;
        let legacy = self.store.get(LEGACY_KEY_PAIR_ID).await?;

        if let Some(legacy_pair) = legacy.as_ref() {
            let migrate = match scoped.as_ref() {
                None => {
                    info!(user_id, "Migrating legacy key pair to scoped id");
                    true
                }
                // Drift repair: migration partially ran elsewhere and the
                // directory still tracks the legacy key. The published key
                // decides which material the user's peers encrypt against,
                // so the legacy pair wins.
                Some(scoped_pair)
                    if published == Some(legacy_pair.exported_public_key().as_str())
                        && published != Some(scoped_pair.exported_public_key().as_str()) =>
                {
                    warn!(
                        user_id,
                        "Scoped key pair is stale relative to the published key, re-migrating"
                    );
                    true
                }
                Some(_) => false,
            };

            if migrate {
                match self.migrate(legacy_pair, &scoped_id, cancel).await? {
                    Some(pair) => scoped = Some(pair),
                    None => return Ok(()),
                }
            }
        }

        let pair = match scoped {
            Some(pair) => pair,
            None => {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                info!(user_id, "Generating new key pair");
                let pair = StoredKeyPair::generate(scoped_id);
                self.store.put(pair.clone()).await?;
                pair
            }
        };

        let exported = pair.exported_public_key();
        if published != Some(exported.as_str()) {
            if cancel.is_cancelled() {
                return Ok(());
            }
            info!(user_id, "Publishing public key");
            self.directory.publish_public_key(user_id, &exported).await?;
        }

        Ok(())
    }

    /// Re-store the legacy material under the scoped id, delete the
    /// legacy entry, and re-read the result. Returns `None` when the
    /// observation was cancelled mid-flight.
    async fn migrate(
        &self,
        legacy: &StoredKeyPair,
        scoped_id: &str,
        cancel: &CancelToken,
    ) -> Result<Option<StoredKeyPair>> {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        self.store.put(legacy.rekeyed_as(scoped_id)).await?;

        if cancel.is_cancelled() {
            return Ok(None);
        }
        self.store.delete(LEGACY_KEY_PAIR_ID).await?;

        let migrated = self
            .store
            .get(scoped_id)
            .await?
            .ok_or_else(|| Error::Storage("Key pair missing after migration".into()))?;
        Ok(Some(migrated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_store::MemoryKeyStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDirectory {
        published: Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl PublicKeyDirectory for RecordingDirectory {
        async fn publish_public_key(&self, user_id: &str, public_key: &str) -> Result<()> {
            self.published
                .lock()
                .unwrap()
                .push((user_id.to_owned(), public_key.to_owned()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        contexts: Mutex<Vec<String>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, context: &str, _error: &Error, _fields: serde_json::Value) {
            self.contexts.lock().unwrap().push(context.to_owned());
        }
    }

    fn build_manager(
        store: Arc<dyn KeyStore>,
    ) -> (
        KeyLifecycleManager,
        Arc<RecordingDirectory>,
        Arc<RecordingReporter>,
    ) {
        let directory = Arc::new(RecordingDirectory::default());
        let reporter = Arc::new(RecordingReporter::default());
        let manager = KeyLifecycleManager::new(store, directory.clone(), reporter.clone());
        (manager, directory, reporter)
    }

    #[tokio::test]
    async fn test_generates_and_publishes_when_store_is_empty() {
        let store = Arc::new(MemoryKeyStore::new());
        let (manager, directory, reporter) = build_manager(store.clone());

        manager
            .ensure_keys("alice", None, &CancelToken::new())
            .await;

        let pair = store.get("key-pair:alice").await.unwrap().unwrap();
        let published = directory.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0], ("alice".into(), pair.exported_public_key()));
        assert!(reporter.contexts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_migrates_legacy_pair_to_scoped_id() {
        let store = Arc::new(MemoryKeyStore::new());
        let legacy = StoredKeyPair::generate(LEGACY_KEY_PAIR_ID);
        let exported = legacy.exported_public_key();
        store.put(legacy).await.unwrap();

        let (manager, directory, _) = build_manager(store.clone());
        manager
            .ensure_keys("alice", None, &CancelToken::new())
            .await;

        let scoped = store.get("key-pair:alice").await.unwrap().unwrap();
        assert_eq!(scoped.exported_public_key(), exported);
        assert!(store.get(LEGACY_KEY_PAIR_ID).await.unwrap().is_none());

        let published = directory.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1, exported);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent_and_silent() {
        let store = Arc::new(MemoryKeyStore::new());
        let legacy = StoredKeyPair::generate(LEGACY_KEY_PAIR_ID);
        store.put(legacy).await.unwrap();

        let (manager, directory, _) = build_manager(store.clone());
        manager
            .ensure_keys("alice", None, &CancelToken::new())
            .await;

        let first = store.get("key-pair:alice").await.unwrap().unwrap();
        let exported = first.exported_public_key();

        // Second observation now carries the published key
        manager
            .ensure_keys("alice", Some(&exported), &CancelToken::new())
            .await;

        let second = store.get("key-pair:alice").await.unwrap().unwrap();
        assert_eq!(second.exported_public_key(), exported);
        assert_eq!(
            second.private_key.as_bytes(),
            first.private_key.as_bytes()
        );
        // No redundant publish on the second run
        assert_eq!(directory.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_scoped_pair_is_replaced_by_legacy() {
        let store = Arc::new(MemoryKeyStore::new());
        let stale_scoped = StoredKeyPair::generate(scoped_key_pair_id("alice"));
        let legacy = StoredKeyPair::generate(LEGACY_KEY_PAIR_ID);
        let legacy_exported = legacy.exported_public_key();
        store.put(stale_scoped).await.unwrap();
        store.put(legacy).await.unwrap();

        let (manager, directory, _) = build_manager(store.clone());

        // The directory tracks the legacy key: the scoped entry is drift
        manager
            .ensure_keys("alice", Some(&legacy_exported), &CancelToken::new())
            .await;

        let scoped = store.get("key-pair:alice").await.unwrap().unwrap();
        assert_eq!(scoped.exported_public_key(), legacy_exported);
        assert!(store.get(LEGACY_KEY_PAIR_ID).await.unwrap().is_none());
        // The published key already matched the resolved pair
        assert!(directory.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_matching_scoped_and_published_changes_nothing() {
        let store = Arc::new(MemoryKeyStore::new());
        let scoped = StoredKeyPair::generate(scoped_key_pair_id("alice"));
        let exported = scoped.exported_public_key();
        store.put(scoped).await.unwrap();

        let (manager, directory, _) = build_manager(store.clone());
        manager
            .ensure_keys("alice", Some(&exported), &CancelToken::new())
            .await;

        assert!(directory.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_observation_mutates_nothing() {
        let store = Arc::new(MemoryKeyStore::new());
        let (manager, directory, reporter) = build_manager(store.clone());

        let cancel = CancelToken::new();
        cancel.cancel();
        manager.ensure_keys("alice", None, &cancel).await;

        assert!(store.get("key-pair:alice").await.unwrap().is_none());
        assert!(directory.published.lock().unwrap().is_empty());
        // Cancellation is not a failure
        assert!(reporter.contexts.lock().unwrap().is_empty());
    }

    /// A store whose reads suspend, so a bootstrap holds its latch
    /// across a real yield point.
    struct YieldingStore(MemoryKeyStore);

    #[async_trait::async_trait]
    impl KeyStore for YieldingStore {
        async fn get(&self, id: &str) -> Result<Option<StoredKeyPair>> {
            tokio::task::yield_now().await;
            self.0.get(id).await
        }

        async fn put(&self, pair: StoredKeyPair) -> Result<()> {
            self.0.put(pair).await
        }

        async fn delete(&self, id: &str) -> Result<()> {
            self.0.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_latched() {
        let store = Arc::new(YieldingStore(MemoryKeyStore::new()));
        let (manager, directory, _) = build_manager(store);
        let cancel = CancelToken::new();

        // The first future takes the latch on its first poll and then
        // suspends in the store; the second observes the latch and skips.
        tokio::join!(
            manager.ensure_keys("alice", None, &cancel),
            manager.ensure_keys("alice", None, &cancel),
        );

        assert_eq!(directory.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported_and_swallowed() {
        struct FailingDirectory;

        #[async_trait::async_trait]
        impl PublicKeyDirectory for FailingDirectory {
            async fn publish_public_key(&self, _user_id: &str, _public_key: &str) -> Result<()> {
                Err(Error::Storage("directory unavailable".into()))
            }
        }

        let store = Arc::new(MemoryKeyStore::new());
        let reporter = Arc::new(RecordingReporter::default());
        let manager = KeyLifecycleManager::new(
            store.clone(),
            Arc::new(FailingDirectory),
            reporter.clone(),
        );

        manager
            .ensure_keys("alice", None, &CancelToken::new())
            .await;

        // The key pair exists locally despite the failed publish
        assert!(store.get("key-pair:alice").await.unwrap().is_some());
        assert_eq!(
            reporter.contexts.lock().unwrap().as_slice(),
            ["key_lifecycle"]
        );
    }
}
