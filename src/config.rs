//! Client configuration.
//!
//! The uplink recognises three options: the collector endpoint, the delay
//! before reconnecting after an abrupt close, and the interval used by the
//! periodic heartbeat task.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use telemetry_uplink::ClientConfig;
//!
//! let config = ClientConfig::new("wss://stats.example.com/ws")
//!     .with_reconnect_delay(Duration::from_secs(2))
//!     .with_heartbeat_interval(Duration::from_secs(15));
//!
//! assert!(config.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Delay between an abrupt close and the next connect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Interval between periodic heartbeats.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// ClientConfig
// ============================================================================

/// Configuration for a [`ResilientSocketClient`](crate::ResilientSocketClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Collector endpoint, `ws://` or `wss://`.
    pub url: String,

    /// Delay before reconnecting after an abrupt close.
    pub reconnect_delay: Duration,

    /// Interval used by [`start_heartbeat`](crate::ResilientSocketClient::start_heartbeat).
    pub heartbeat_interval: Duration,
}

impl ClientConfig {
    /// Creates a configuration for `url` with default timings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    /// Sets the reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Validates the configuration and returns the parsed endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the URL does not parse
    /// - [`Error::Config`] if the scheme is not `ws`/`wss` or a duration is zero
    pub fn validate(&self) -> Result<Url> {
        let url = Url::parse(&self.url)?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "Unsupported URL scheme '{}': expected ws or wss",
                url.scheme()
            )));
        }

        if self.reconnect_delay.is_zero() {
            return Err(Error::config("reconnect delay must be non-zero"));
        }

        if self.heartbeat_interval.is_zero() {
            return Err(Error::config("heartbeat interval must be non-zero"));
        }

        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================
