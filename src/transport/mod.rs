//! Transport layer.
//!
//! A [`Transport`] opens [`Handle`]s. A handle is one transport session: it
//! reports its ready state, accepts text frames, and can be closed. Lifecycle
//! signals are delivered to a single [`Listener`] bound when the handle is
//! opened, so nothing can fire before the owner is listening.
//!
//! # Listener re-entrancy
//!
//! The client calls [`Transport::open`] and every [`Handle`] method while
//! holding its own non-reentrant lock, and the listener takes that same lock.
//! Implementations must never invoke the listener from inside `open`, `send`,
//! `close` or `unbind`; events are delivered later, from the transport's own
//! task or from an external driver.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   open(url, listener)   ┌──────────────────────┐
//! │ ResilientSocketClient│────────────────────────►│ Transport            │
//! │                      │                         │  → Handle            │
//! │   on_event(id, ev)   │◄──── TransportEvent ────│   send / close       │
//! └──────────────────────┘                         └──────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | tokio-tungstenite transport, one task per handle |
//! | `memory` | In-process transport driven by hand |

// ============================================================================
// Submodules
// ============================================================================

/// In-process transport driven by hand.
pub mod memory;

/// WebSocket transport over tokio-tungstenite.
pub mod websocket;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::Result;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::{MemoryHandle, MemoryTransport};
pub use websocket::{WebSocketHandle, WebSocketTransport};

// ============================================================================
// Types
// ============================================================================

/// Callback receiving every lifecycle signal of one handle.
pub type Listener = Arc<dyn Fn(TransportEvent) + Send + Sync>;

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle signal emitted by a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed; the handle is open.
    Opened,
    /// Session ended. `clean` is `false` for an abrupt close.
    Closed {
        /// Whether an orderly close handshake preceded the closure.
        clean: bool,
    },
    /// Text frame received from the collector.
    Message(String),
    /// Transport-level failure. A `Closed` event normally follows.
    Error(String),
}

// ============================================================================
// ReadyState
// ============================================================================

/// Ready state reported by a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    /// Handshake in progress.
    Connecting = 0,
    /// Usable for sends.
    Open = 1,
    /// Close requested, not yet complete.
    Closing = 2,
    /// Session is over.
    Closed = 3,
}

impl ReadyState {
    /// Decodes a value previously produced by `as u8`.
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Factory for transport sessions.
pub trait Transport: Send + Sync {
    /// Starts opening a session to `url` and returns immediately.
    ///
    /// Completion is reported later through `listener` as
    /// [`TransportEvent::Opened`] or [`TransportEvent::Closed`]. The listener
    /// must not be called before `open` returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle cannot be created at all.
    fn open(&self, url: &Url, listener: Listener) -> Result<Arc<dyn Handle>>;
}

// ============================================================================
// Handle
// ============================================================================

/// One transport session.
///
/// None of these methods may call the bound listener synchronously.
pub trait Handle: Send + Sync {
    /// Current ready state. Never cached by callers.
    fn ready_state(&self) -> ReadyState;

    /// Sends one text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not open or the frame cannot be queued.
    fn send(&self, text: &str) -> Result<()>;

    /// Requests an orderly close. Safe to call more than once.
    ///
    /// The resulting [`TransportEvent::Closed`] is emitted asynchronously, if
    /// at all.
    fn close(&self);

    /// Drops the listener so no further events are delivered.
    fn unbind(&self);
}

// ============================================================================
// Tests
// ============================================================================
