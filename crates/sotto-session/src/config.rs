//! Session configuration.

use std::path::PathBuf;

/// Default plaintext cache capacity.
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

/// Default directory for the on-disk key store.
pub const DEFAULT_KEY_DIR: &str = "sotto-keys";

/// Configuration for one authenticated session's encryption machinery.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of cached plaintexts before FIFO eviction.
    pub cache_capacity: usize,
    /// Directory holding the durable key store document.
    pub key_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            key_dir: PathBuf::from(DEFAULT_KEY_DIR),
        }
    }
}

impl SessionConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `SOTTO_CACHE_CAPACITY` | `500` | Plaintext cache capacity |
    /// | `SOTTO_KEY_DIR` | `sotto-keys` | Key store directory |
    pub fn from_env() -> Self {
        let cache_capacity = std::env::var("SOTTO_CACHE_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_CACHE_CAPACITY)
            .max(1);

        let key_dir = std::env::var("SOTTO_KEY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_KEY_DIR));

        Self {
            cache_capacity,
            key_dir,
        }
    }

    /// Set the plaintext cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the key store directory.
    pub fn with_key_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.key_dir = dir.into();
        self
    }
}
