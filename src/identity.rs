//! Identity provider for heartbeat payloads.
//!
//! The identity is an opaque string embedded verbatim in each heartbeat.

// ============================================================================
// IdentityProvider
// ============================================================================

/// Supplies the identity token used in heartbeat payloads.
///
/// Queried on every periodic heartbeat so a provider may change its answer
/// over the client's lifetime (e.g. after the user logs in).
pub trait IdentityProvider: Send + Sync + 'static {
    /// Returns the current identity token.
    fn identity(&self) -> String;
}

impl IdentityProvider for String {
    fn identity(&self) -> String {
        self.clone()
    }
}

impl IdentityProvider for &'static str {
    fn identity(&self) -> String {
        (*self).to_owned()
    }
}

impl<F> IdentityProvider for F
where
    F: Fn() -> String + Send + Sync + 'static,
{
    fn identity(&self) -> String {
        self()
    }
}

// ============================================================================
// Tests
// ============================================================================
