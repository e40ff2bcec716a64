//! Wire-level message types.
//!
//! The uplink treats telemetry payloads as opaque serializable values. The
//! only shape it defines itself is the heartbeat.
//!
//! | Message | Direction | Buffered |
//! |---------|-----------|----------|
//! | Telemetry payload | Client → Collector | Yes |
//! | [`HeartbeatPayload`] | Client → Collector | No |
//! | Inbound text | Collector → Client | Logged only |

// ============================================================================
// Submodules
// ============================================================================

/// Heartbeat payload.
pub mod heartbeat;

/// Payload serialization.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use heartbeat::HeartbeatPayload;
pub use message::serialize;
