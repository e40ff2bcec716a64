//! In-process transport driven by hand.
//!
//! [`MemoryTransport`] never touches the network. Every handle it opens is
//! recorded and starts in [`ReadyState::Connecting`]; the owner of the
//! transport decides when it opens, receives a frame, fails or closes. Sent
//! frames are captured in order.
//!
//! Useful for exercising reconnection and buffering logic deterministically,
//! and as a stand-in collector for embedders' own tests.
//!
//! # Example
//!
//! ```
//! use telemetry_uplink::{MemoryTransport, ResilientSocketClient};
//!
//! let transport = MemoryTransport::new();
//! let client = ResilientSocketClient::builder()
//!     .url("ws://collector.test/stats")
//!     .transport(transport.clone())
//!     .build()
//!     .unwrap();
//!
//! client.connect();
//! transport.last_handle().unwrap().open();
//! assert!(client.is_connected());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

use crate::error::{Error, Result};

use super::{Handle, Listener, ReadyState, Transport, TransportEvent};

// ============================================================================
// MemoryTransport
// ============================================================================

/// Transport whose handles are driven explicitly.
///
/// Clones share the same record of opened handles.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<TransportInner>>,
}

#[derive(Default)]
struct TransportInner {
    /// Every handle opened, oldest first.
    handles: Vec<Arc<MemoryHandle>>,
    /// Fail the next `open` call with this message.
    fail_next_open: Option<String>,
}

impl MemoryTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next [`Transport::open`] call fail.
    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.inner.lock().fail_next_open = Some(message.into());
    }

    /// Number of handles opened so far.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.inner.lock().handles.len()
    }

    /// All handles opened so far, oldest first.
    #[must_use]
    pub fn handles(&self) -> Vec<Arc<MemoryHandle>> {
        self.inner.lock().handles.clone()
    }

    /// Most recently opened handle.
    #[must_use]
    pub fn last_handle(&self) -> Option<Arc<MemoryHandle>> {
        self.inner.lock().handles.last().cloned()
    }
}

impl Transport for MemoryTransport {
    fn open(&self, url: &Url, listener: Listener) -> Result<Arc<dyn Handle>> {
        let mut inner = self.inner.lock();

        if let Some(message) = inner.fail_next_open.take() {
            return Err(Error::connection(message));
        }

        let handle = Arc::new(MemoryHandle {
            url: url.clone(),
            state: Mutex::new(HandleState {
                ready: ReadyState::Connecting,
                sent: Vec::new(),
                fail_sends: None,
                close_calls: 0,
            }),
            listener: Mutex::new(Some(listener)),
        });
        inner.handles.push(Arc::clone(&handle));

        Ok(handle)
    }
}

// ============================================================================
// MemoryHandle
// ============================================================================

/// Handle opened by [`MemoryTransport`].
pub struct MemoryHandle {
    url: Url,
    state: Mutex<HandleState>,
    listener: Mutex<Option<Listener>>,
}

struct HandleState {
    ready: ReadyState,
    sent: Vec<String>,
    /// Sends fail after this many more successes.
    fail_sends: Option<usize>,
    close_calls: usize,
}

impl MemoryHandle {
    /// URL the handle was opened with.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Frames sent through this handle, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    /// Number of times [`Handle::close`] was called.
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }

    /// Whether a listener is still bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Completes the handshake.
    pub fn open(&self) {
        self.state.lock().ready = ReadyState::Open;
        self.emit(TransportEvent::Opened);
    }

    /// Delivers an inbound text frame.
    pub fn deliver(&self, text: impl Into<String>) {
        self.emit(TransportEvent::Message(text.into()));
    }

    /// Reports a transport error without changing the ready state.
    pub fn fail(&self, message: impl Into<String>) {
        self.emit(TransportEvent::Error(message.into()));
    }

    /// Ends the session after an orderly close handshake.
    pub fn close_cleanly(&self) {
        self.state.lock().ready = ReadyState::Closed;
        self.emit(TransportEvent::Closed { clean: true });
    }

    /// Ends the session without a close handshake.
    pub fn close_abruptly(&self) {
        self.state.lock().ready = ReadyState::Closed;
        self.emit(TransportEvent::Closed { clean: false });
    }

    /// Lets `successes` more sends through, then fails every send.
    pub fn fail_sends_after(&self, successes: usize) {
        self.state.lock().fail_sends = Some(successes);
    }

    /// Stops failing sends.
    pub fn heal_sends(&self) {
        self.state.lock().fail_sends = None;
    }

    fn emit(&self, event: TransportEvent) {
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(event);
        }
    }
}

impl Handle for MemoryHandle {
    fn ready_state(&self) -> ReadyState {
        self.state.lock().ready
    }

    fn send(&self, text: &str) -> Result<()> {
        let mut state = self.state.lock();

        if state.ready != ReadyState::Open {
            return Err(Error::NotOpen);
        }

        if let Some(remaining) = state.fail_sends.as_mut() {
            if *remaining == 0 {
                return Err(Error::connection("send rejected"));
            }
            *remaining -= 1;
        }

        state.sent.push(text.to_owned());
        Ok(())
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.close_calls += 1;
        state.ready = ReadyState::Closed;
    }

    fn unbind(&self) {
        self.listener.lock().take();
    }
}

// ============================================================================
// Tests
// ============================================================================
