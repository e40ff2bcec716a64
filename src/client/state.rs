//! Connection state of the client.

use std::fmt;

/// Lifecycle state of a [`ResilientSocketClient`](crate::ResilientSocketClient).
///
/// Exactly one state holds at any instant.
///
/// ```text
/// Disconnected ──connect()──► Connecting ──opened──► Open
///      ▲                          │                    │
///      │◄──── closed (clean / abrupt) ◄────────────────┤
///      │                                               │
///      └──────────── Closing ◄──── disconnect() ◄──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No handle.
    #[default]
    Disconnected,
    /// Handle created, handshake in progress.
    Connecting,
    /// Handshake completed.
    Open,
    /// Tearing down inside `disconnect()`.
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}
