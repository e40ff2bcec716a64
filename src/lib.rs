//! Telemetry uplink - resilient WebSocket client for telemetry collectors.
//!
//! This library keeps a persistent telemetry connection from an application
//! to a remote collector. It survives flaky connectivity without losing
//! buffered data and without blocking the caller.
//!
//! # Architecture
//!
//! - **Client**: owns one logical connection and a FIFO outbound buffer
//! - **Transport**: opens sessions and reports their lifecycle through one listener
//! - **Reachability**: host-provided online/offline signal gating every reconnect
//!
//! Key design principles:
//!
//! - Buffer first, check connectivity second: a message is never dropped by a race
//! - Reconnect only when online: no retry storms while the device is offline
//! - Nothing throws outward: failures are logged, callers see booleans
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use serde_json::json;
//! use telemetry_uplink::{ResilientSocketClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ResilientSocketClient::builder()
//!         .url("wss://stats.example.com/ws")
//!         .reconnect_delay(Duration::from_secs(5))
//!         .build()?;
//!
//!     client.connect();
//!     let _heartbeat = client.start_heartbeat("alice@example.com")?;
//!
//!     // Buffered now, delivered once the socket is open
//!     client.send(&json!({ "event": "call_answered", "mos": 4.2 }));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`ResilientSocketClient`], builder, buffer, heartbeat task |
//! | [`config`] | [`ClientConfig`] and defaults |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`identity`] | Identity provider for heartbeats |
//! | [`protocol`] | Heartbeat payload and message serialization |
//! | [`reachability`] | Online/offline signal |
//! | [`transport`] | Transport traits, WebSocket and in-memory transports |

// ============================================================================
// Modules
// ============================================================================

/// Resilient socket client.
///
/// - [`ResilientSocketClient`] - connection lifecycle and buffering
/// - [`ClientBuilder`] - fluent configuration
/// - [`HeartbeatTask`] - periodic liveness sender
pub mod client;

/// Client configuration.
pub mod config;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Identity provider for heartbeat payloads.
pub mod identity;

/// Wire-level message types.
pub mod protocol;

/// Network reachability signal.
pub mod reachability;

/// Transport abstraction and implementations.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ClientBuilder, ConnectionState, HeartbeatTask, ResilientSocketClient};

// Configuration
pub use config::{ClientConfig, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_RECONNECT_DELAY};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::HandleId;

// Collaborators
pub use identity::IdentityProvider;
pub use reachability::{AlwaysOnline, NetworkStatus, Reachability};

// Transport types
pub use transport::{
    Handle, MemoryTransport, ReadyState, Transport, TransportEvent, WebSocketTransport,
};
