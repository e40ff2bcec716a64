//! Network reachability signal.
//!
//! The client polls [`Reachability::is_online`] at each decision point
//! (draining, reconnecting, scheduling a reconnect) and never writes to it.
//! The host environment decides what "online" means.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// Reachability
// ============================================================================

/// Host-provided "is the device online" query.
pub trait Reachability: Send + Sync {
    /// Returns `true` if the device currently has network connectivity.
    fn is_online(&self) -> bool;
}

impl<F> Reachability for F
where
    F: Fn() -> bool + Send + Sync,
{
    #[inline]
    fn is_online(&self) -> bool {
        self()
    }
}

// ============================================================================
// AlwaysOnline
// ============================================================================

/// Reachability that always reports online.
///
/// Default when the host has no connectivity signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Reachability for AlwaysOnline {
    #[inline]
    fn is_online(&self) -> bool {
        true
    }
}

// ============================================================================
// NetworkStatus
// ============================================================================

/// Shared online/offline flag the host flips from its own network watcher.
///
/// Clones share the same flag.
#[derive(Debug, Clone)]
pub struct NetworkStatus {
    online: Arc<AtomicBool>,
}

impl NetworkStatus {
    /// Creates a flag with the given initial value.
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    /// Updates the flag.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Reachability for NetworkStatus {
    #[inline]
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tests
// ============================================================================
