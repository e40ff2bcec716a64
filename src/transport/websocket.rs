//! WebSocket transport over tokio-tungstenite.
//!
//! Each handle owns one tokio task. The task performs the handshake, then
//! runs an event loop that handles:
//!
//! - Incoming frames from the collector (text is forwarded, control frames ignored)
//! - Outgoing text frames queued through [`Handle::send`]
//! - Close requests from [`Handle::close`] or from dropping the handle
//!
//! Close classification: a close frame from the collector or a locally
//! requested close is clean; a failed handshake, an I/O error or a stream
//! that ends without a close frame is abrupt.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{Handle, Listener, ReadyState, Transport, TransportEvent};

// ============================================================================
// HandleCommand
// ============================================================================

/// Internal commands for the session task.
enum HandleCommand {
    /// Write a text frame.
    Send(String),
    /// Close the session.
    Close,
}

// ============================================================================
// SessionShared
// ============================================================================

/// State shared between a handle and its session task.
struct SessionShared {
    /// Current [`ReadyState`] as `u8`.
    ready: AtomicU8,
    /// Bound listener; `None` once unbound.
    listener: Mutex<Option<Listener>>,
}

impl SessionShared {
    fn ready(&self) -> ReadyState {
        ReadyState::from_u8(self.ready.load(Ordering::SeqCst))
    }

    fn set_ready(&self, state: ReadyState) {
        self.ready.store(state as u8, Ordering::SeqCst);
    }

    /// Moves `from → to` only if the current state is `from`.
    fn transition(&self, from: ReadyState, to: ReadyState) -> bool {
        self.ready
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Delivers an event without holding the slot lock during the call.
    fn emit(&self, event: TransportEvent) {
        let listener = self.listener.lock().clone();
        match listener {
            Some(listener) => listener(event),
            None => trace!(?event, "Event dropped, listener unbound"),
        }
    }
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Transport that opens WebSocket sessions.
///
/// Must be used from within a tokio runtime; opening a handle anywhere else
/// fails with [`Error::NoRuntime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Creates the transport.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Transport for WebSocketTransport {
    fn open(&self, url: &Url, listener: Listener) -> Result<Arc<dyn Handle>> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SessionShared {
            ready: AtomicU8::new(ReadyState::Connecting as u8),
            listener: Mutex::new(Some(listener)),
        });

        runtime.spawn(run_session(url.clone(), command_rx, Arc::clone(&shared)));

        debug!(url = %url, "WebSocket session started");

        Ok(Arc::new(WebSocketHandle { command_tx, shared }))
    }
}

// ============================================================================
// WebSocketHandle
// ============================================================================

/// Handle to one WebSocket session.
///
/// Dropping the last reference closes the session.
pub struct WebSocketHandle {
    /// Channel to the session task.
    command_tx: mpsc::UnboundedSender<HandleCommand>,
    /// State shared with the session task.
    shared: Arc<SessionShared>,
}

impl Handle for WebSocketHandle {
    fn ready_state(&self) -> ReadyState {
        self.shared.ready()
    }

    fn send(&self, text: &str) -> Result<()> {
        if self.shared.ready() != ReadyState::Open {
            return Err(Error::NotOpen);
        }

        self.command_tx
            .send(HandleCommand::Send(text.to_owned()))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&self) {
        let requested = self.shared.transition(ReadyState::Open, ReadyState::Closing)
            || self
                .shared
                .transition(ReadyState::Connecting, ReadyState::Closing);

        if requested {
            let _ = self.command_tx.send(HandleCommand::Close);
        }
    }

    fn unbind(&self) {
        self.shared.listener.lock().take();
    }
}

// ============================================================================
// Session Task
// ============================================================================

/// Handshake followed by the event loop.
async fn run_session(
    url: Url,
    mut command_rx: mpsc::UnboundedReceiver<HandleCommand>,
    shared: Arc<SessionShared>,
) {
    let ws_stream = tokio::select! {
        result = connect_async(url.as_str()) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                let e = Error::from(e);
                warn!(url = %url, error = %e, "WebSocket handshake failed");
                shared.set_ready(ReadyState::Closed);
                shared.emit(TransportEvent::Error(e.to_string()));
                shared.emit(TransportEvent::Closed { clean: false });
                return;
            }
        },

        () = wait_for_close(&mut command_rx) => {
            debug!(url = %url, "Close requested during handshake");
            shared.set_ready(ReadyState::Closed);
            shared.emit(TransportEvent::Closed { clean: true });
            return;
        }
    };

    let (mut ws_write, mut ws_read) = ws_stream.split();

    // close() may have raced the handshake
    if !shared.transition(ReadyState::Connecting, ReadyState::Open) {
        let _ = ws_write.close().await;
        shared.set_ready(ReadyState::Closed);
        shared.emit(TransportEvent::Closed { clean: true });
        return;
    }

    debug!(url = %url, "WebSocket open");
    shared.emit(TransportEvent::Opened);

    let clean = loop {
        tokio::select! {
            // Incoming frames from collector
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        shared.emit(TransportEvent::Message(text.as_str().to_owned()));
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "WebSocket closed by remote");
                        // Pushes out the queued close reply
                        let _ = ws_write.flush().await;
                        break true;
                    }

                    Some(Err(e)) => {
                        let e = Error::from(e);
                        warn!(error = %e, "WebSocket error");
                        shared.emit(TransportEvent::Error(e.to_string()));
                        break false;
                    }

                    None => {
                        debug!("WebSocket stream ended without close frame");
                        break false;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Commands from the handle
            command = command_rx.recv() => {
                match command {
                    Some(HandleCommand::Send(text)) => {
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            let e = Error::from(e);
                            warn!(error = %e, "Failed to write frame");
                            shared.emit(TransportEvent::Error(e.to_string()));
                            break false;
                        }
                        trace!("Frame written");
                    }

                    Some(HandleCommand::Close) | None => {
                        shared.set_ready(ReadyState::Closing);
                        let _ = ws_write.close().await;
                        break true;
                    }
                }
            }
        }
    };

    shared.set_ready(ReadyState::Closed);
    shared.emit(TransportEvent::Closed { clean });

    debug!(url = %url, clean, "WebSocket session terminated");
}

/// Resolves once a close is requested or the handle is dropped.
async fn wait_for_close(command_rx: &mut mpsc::UnboundedReceiver<HandleCommand>) {
    loop {
        match command_rx.recv().await {
            Some(HandleCommand::Close) | None => return,
            Some(HandleCommand::Send(_)) => trace!("Discarded frame queued before open"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
