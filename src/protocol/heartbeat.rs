//! Heartbeat payload.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Liveness status reported by every heartbeat.
pub const HEARTBEAT_STATUS: &str = "healthy";

// ============================================================================
// HeartbeatPayload
// ============================================================================

/// Fixed-shape liveness message.
///
/// # Format
///
/// ```json
/// { "heartbeat": "healthy", "username": "<identity>" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatPayload<'a> {
    /// Always [`HEARTBEAT_STATUS`].
    pub heartbeat: &'static str,

    /// Identity token, verbatim.
    pub username: &'a str,
}

impl<'a> HeartbeatPayload<'a> {
    /// Creates a heartbeat for `identity`.
    #[inline]
    #[must_use]
    pub const fn new(identity: &'a str) -> Self {
        Self {
            heartbeat: HEARTBEAT_STATUS,
            username: identity,
        }
    }

    /// Serializes the payload to JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
