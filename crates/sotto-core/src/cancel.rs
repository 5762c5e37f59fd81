//! Cooperative cancellation for UI-bound flows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation token shared between a unit of work and its owner.
///
/// Flows check the token before every state-mutating step that follows a
/// suspension point; a cancelled flow lets in-flight operations finish
/// but discards their results instead of applying them. Cloning is cheap
/// and all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a live (non-cancelled) token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the unit of work as torn down.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the owning unit of work has been torn down.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
