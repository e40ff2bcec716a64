//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating
//! [`ResilientSocketClient`] instances.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use telemetry_uplink::{NetworkStatus, ResilientSocketClient};
//!
//! # fn example() -> telemetry_uplink::Result<()> {
//! let network = NetworkStatus::new(true);
//! let client = ResilientSocketClient::builder()
//!     .url("wss://stats.example.com/ws")
//!     .reconnect_delay(Duration::from_secs(2))
//!     .reachability(network.clone())
//!     .build()?;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ClientConfig, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_RECONNECT_DELAY};
use crate::error::{Error, Result};
use crate::reachability::{AlwaysOnline, Reachability};
use crate::transport::{Transport, WebSocketTransport};

use super::core::ResilientSocketClient;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for a [`ResilientSocketClient`].
///
/// Use [`ResilientSocketClient::builder()`] to create a new builder.
/// Defaults: [`WebSocketTransport`], [`AlwaysOnline`] reachability,
/// [`DEFAULT_RECONNECT_DELAY`], [`DEFAULT_HEARTBEAT_INTERVAL`].
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Collector endpoint.
    url: Option<String>,
    /// Delay before reconnecting after an abrupt close.
    reconnect_delay: Option<Duration>,
    /// Interval for the periodic heartbeat.
    heartbeat_interval: Option<Duration>,
    /// Transport implementation.
    transport: Option<Arc<dyn Transport>>,
    /// Network reachability signal.
    reachability: Option<Arc<dyn Reachability>>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the collector endpoint (`ws://` or `wss://`).
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the delay before reconnecting after an abrupt close.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = Some(delay);
        self
    }

    /// Sets the periodic heartbeat interval.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Takes endpoint and timings from an existing configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.url = Some(config.url);
        self.reconnect_delay = Some(config.reconnect_delay);
        self.heartbeat_interval = Some(config.heartbeat_interval);
        self
    }

    /// Sets the transport.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets the reachability signal.
    #[must_use]
    pub fn reachability(mut self, reachability: impl Reachability + 'static) -> Self {
        self.reachability = Some(Arc::new(reachability));
        self
    }

    /// Builds the client with validation. Does not connect.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is missing, not `ws`/`wss`, or a duration is zero
    /// - [`Error::Url`] if the URL does not parse
    pub fn build(self) -> Result<ResilientSocketClient> {
        let config = self.validate_config()?;
        let url = config.validate()?;

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WebSocketTransport::new()));
        let reachability = self
            .reachability
            .unwrap_or_else(|| Arc::new(AlwaysOnline));

        Ok(ResilientSocketClient::new(
            config,
            url,
            transport,
            reachability,
        ))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Assembles the configuration, applying defaults.
    fn validate_config(&self) -> Result<ClientConfig> {
        let url = self.url.clone().ok_or_else(|| {
            Error::config(
                "Endpoint URL is required. Use .url() to set it.\n\
                 Example: ResilientSocketClient::builder().url(\"wss://stats.example.com/ws\")",
            )
        })?;

        Ok(ClientConfig::new(url)
            .with_reconnect_delay(self.reconnect_delay.unwrap_or(DEFAULT_RECONNECT_DELAY))
            .with_heartbeat_interval(
                self.heartbeat_interval
                    .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL),
            ))
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("url", &self.url)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("custom_transport", &self.transport.is_some())
            .field("custom_reachability", &self.reachability.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
