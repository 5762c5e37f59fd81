//! Bounded plaintext cache keyed by identity and ciphertext.
//!
//! Decrypted message content is memoized so list re-renders and
//! optimistic updates never pay for (or flicker through) a second
//! decryption. Ciphertext strings are not trusted to be unique across
//! identities, so the cache tracks the identity it was filled under and
//! clears itself completely whenever a different one appears - plaintext
//! must never survive a sign-out/sign-in inside one process.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

/// FIFO-bounded map of `(user_id, ciphertext)` to plaintext.
///
/// One instance belongs to one session context; it is not shared across
/// identities by construction, and defends in depth by clearing on any
/// identity switch it observes.
pub struct PlaintextCache {
    active_user: Option<String>,
    entries: HashMap<String, String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl PlaintextCache {
    /// Create an empty cache bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            active_user: None,
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn compose_key(user_id: &str, ciphertext: &str) -> String {
        format!("{}{}", user_id, ciphertext)
    }

    /// Clear everything if `user_id` differs from the identity the cache
    /// was filled under.
    fn ensure_user(&mut self, user_id: &str) {
        if self.active_user.as_deref() != Some(user_id) {
            if self.active_user.is_some() {
                debug!(user_id, "Identity switched, clearing plaintext cache");
            }
            self.entries.clear();
            self.order.clear();
            self.active_user = Some(user_id.to_owned());
        }
    }

    /// Look up a previously decrypted plaintext.
    pub fn get(&mut self, user_id: &str, ciphertext: &str) -> Option<String> {
        self.ensure_user(user_id);
        self.entries
            .get(&Self::compose_key(user_id, ciphertext))
            .cloned()
    }

    /// Memoize a decrypted plaintext.
    ///
    /// Re-inserting an existing key refreshes its position in the FIFO
    /// order. When the insertion pushes the cache past capacity, the
    /// single oldest entry is evicted.
    pub fn put(&mut self, user_id: &str, ciphertext: &str, plaintext: impl Into<String>) {
        self.ensure_user(user_id);

        let key = Self::compose_key(user_id, ciphertext);
        if self.entries.remove(&key).is_some() {
            self.order.retain(|k| k != &key);
        }
        self.entries.insert(key.clone(), plaintext.into());
        self.order.push_back(key);

        if self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    /// Number of cached plaintexts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
