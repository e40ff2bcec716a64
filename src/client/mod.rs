//! Resilient socket client.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ResilientSocketClient`] | Connection lifecycle, buffering, reconnection, heartbeats |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ConnectionState`] | `Disconnected` / `Connecting` / `Open` / `Closing` |
//! | [`OutboundBuffer`] | FIFO of serialized messages awaiting a drain pass |
//! | [`HeartbeatTask`] | Periodic heartbeat sender |
//!
//! # Recovery
//!
//! Reconnection is the only recovery action and always checks the
//! reachability signal first:
//!
//! - Abrupt close while online arms a timer for the reconnect delay
//! - `send` or `heartbeat` on an unusable connection reconnects at once
//! - `disconnect` cancels an armed timer

// ============================================================================
// Submodules
// ============================================================================

/// FIFO buffer of outbound messages.
pub mod buffer;

/// Fluent builder.
pub mod builder;

/// Client implementation.
pub mod core;

/// Periodic heartbeat task.
pub mod heartbeat;

/// Connection state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use buffer::{DrainOutcome, OutboundBuffer};
pub use builder::ClientBuilder;
pub use self::core::ResilientSocketClient;
pub use heartbeat::HeartbeatTask;
pub use state::ConnectionState;
