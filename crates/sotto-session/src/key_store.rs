//! Key store implementations: durable JSON document and in-memory.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use sotto_core::{Error, KeyStore, Result, StoredKeyPair};

use crate::config::SessionConfig;

/// File name of the key store document inside the key directory.
const STORE_FILE: &str = "key-pairs.json";

/// Durable key store backed by one JSON document.
///
/// The whole table is read per operation and rewritten atomically
/// (temp file + rename) on mutation. The lifecycle manager is the only
/// writer, so per-id write sequencing is inherent.
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    /// Create a store rooted at `dir`. The directory is created lazily
    /// on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(STORE_FILE),
        }
    }

    /// Create a store at the configured key directory.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.key_dir.clone())
    }

    async fn load(&self) -> Result<HashMap<String, StoredKeyPair>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Storage(format!("Corrupt key store document: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(Error::Storage(format!("Failed to read key store: {}", e))),
        }
    }

    async fn flush(&self, entries: &HashMap<String, StoredKeyPair>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("Failed to create key dir: {}", e)))?;
        }

        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write key store: {}", e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to commit key store: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn get(&self, id: &str) -> Result<Option<StoredKeyPair>> {
        let mut entries = self.load().await?;
        Ok(entries.remove(id))
    }

    async fn put(&self, pair: StoredKeyPair) -> Result<()> {
        let mut entries = self.load().await?;
        debug!(id = %pair.id, "Storing key pair");
        entries.insert(pair.id.clone(), pair);
        self.flush(&entries).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut entries = self.load().await?;
        if entries.remove(id).is_some() {
            debug!(id, "Deleting key pair");
            self.flush(&entries).await?;
        }
        Ok(())
    }
}

/// In-memory key store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<String, StoredKeyPair>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get(&self, id: &str) -> Result<Option<StoredKeyPair>> {
        Ok(self.entries.read().await.get(id).cloned())
    }

    async fn put(&self, pair: StoredKeyPair) -> Result<()> {
        self.entries.write().await.insert(pair.id.clone(), pair);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.entries.write().await.remove(id);
        Ok(())
    }
}
