//! Resilient socket client.
//!
//! One logical connection to a telemetry collector with an outbound buffer
//! that outlives any single transport handle.
//!
//! # Concurrency
//!
//! Handle, state, buffer and reconnect timer sit behind one mutex. Public
//! methods and transport callbacks take it for their whole
//! read/modify/transition sequence, so they can be called from any thread.
//! Transport listeners hold a `Weak` reference to the shared state and carry
//! the [`HandleId`] of the handle they were bound to.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::identifiers::HandleId;
use crate::identity::IdentityProvider;
use crate::protocol::{self, HeartbeatPayload};
use crate::reachability::Reachability;
use crate::transport::{Handle, Listener, ReadyState, Transport, TransportEvent};

use super::buffer::OutboundBuffer;
use super::builder::ClientBuilder;
use super::heartbeat::HeartbeatTask;
use super::state::ConnectionState;

// ============================================================================
// ResilientSocketClient
// ============================================================================

/// Telemetry uplink that buffers, reconnects and sends heartbeats.
///
/// No public method blocks or returns an error: failures are logged and
/// surfaced only through boolean results. Clones share the same connection
/// and buffer.
///
/// # Example
///
/// ```no_run
/// use serde_json::json;
/// use telemetry_uplink::ResilientSocketClient;
///
/// # async fn example() -> telemetry_uplink::Result<()> {
/// let client = ResilientSocketClient::builder()
///     .url("wss://stats.example.com/ws")
///     .build()?;
///
/// client.connect();
/// client.send(&json!({ "event": "call_answered" }));
/// let _heartbeat = client.start_heartbeat("alice@example.com")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ResilientSocketClient {
    shared: Arc<Shared>,
}

impl ResilientSocketClient {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn new(
        config: ClientConfig,
        url: Url,
        transport: Arc<dyn Transport>,
        reachability: Arc<dyn Reachability>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                url,
                transport,
                reachability,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    /// Opens a handle unless one already exists.
    ///
    /// Returns immediately; the handshake completes in the background.
    pub fn connect(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.connect_locked(&mut inner);
    }

    /// Tears down the handle, if any, and cancels a pending reconnect.
    ///
    /// Idempotent.
    pub fn disconnect(&self) {
        self.shared.disconnect();
    }

    /// Replaces the handle with a fresh one when online.
    ///
    /// No-op while offline.
    pub fn reconnect(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.reconnect_locked(&mut inner);
    }

    /// Buffers `message` and drains the buffer if the connection is usable.
    ///
    /// Returns `true` if a drain pass ran. On `false` the message is still
    /// buffered (unless it could not be serialized) and a reconnect is
    /// attempted.
    pub fn send<T>(&self, message: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        self.shared.send(message)
    }

    /// Sends a liveness payload carrying `identity`, bypassing the buffer.
    ///
    /// Returns `true` if the payload was handed to an open handle. On `false`
    /// nothing is buffered and a reconnect is attempted.
    pub fn heartbeat(&self, identity: &str) -> bool {
        self.shared.heartbeat(identity)
    }

    /// Returns `true` if a handle exists and reports itself open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let inner = self.shared.inner.lock();
        inner.is_connected()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.inner.lock().state
    }

    /// Number of messages waiting for a drain pass.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.shared.inner.lock().buffer.len()
    }

    /// Returns `true` while a reconnect timer is armed.
    #[must_use]
    pub fn has_pending_reconnect(&self) -> bool {
        self.shared.inner.lock().reconnect_timer.is_some()
    }

    /// Configuration the client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Sends a heartbeat every configured interval until the returned task
    /// is stopped or dropped, or the client is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuntime`](crate::Error::NoRuntime) outside a tokio runtime.
    pub fn start_heartbeat<I>(&self, identity: I) -> Result<HeartbeatTask>
    where
        I: IdentityProvider,
    {
        HeartbeatTask::spawn(
            Arc::downgrade(&self.shared),
            self.shared.config.heartbeat_interval,
            Box::new(identity),
        )
    }
}

impl fmt::Debug for ResilientSocketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("ResilientSocketClient")
            .field("url", &self.shared.url.as_str())
            .field("state", &inner.state)
            .field("buffered", &inner.buffer.len())
            .finish()
    }
}

// ============================================================================
// Inner
// ============================================================================

/// Current transport session.
struct Current {
    id: HandleId,
    handle: Arc<dyn Handle>,
}

/// Armed reconnect timer.
struct ReconnectTimer {
    /// Matches the epoch the task was armed with; a fired task whose epoch
    /// no longer matches was cancelled while waiting for the lock.
    epoch: u64,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Inner {
    state: ConnectionState,
    current: Option<Current>,
    buffer: OutboundBuffer,
    reconnect_timer: Option<ReconnectTimer>,
    timer_epoch: u64,
}

impl Inner {
    fn is_connected(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| current.handle.ready_state() == ReadyState::Open)
    }

    fn cancel_reconnect_timer(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.task.abort();
            debug!("Pending reconnect cancelled");
        }
    }

    /// Unbinds and closes the current handle, if any.
    fn discard_handle(&mut self) {
        if let Some(current) = self.current.take() {
            current.handle.unbind();
            current.handle.close();
            trace!(handle = %current.id, "Handle discarded");
        }
    }
}

// ============================================================================
// Shared
// ============================================================================

/// State shared by client clones, transport listeners and background tasks.
pub(crate) struct Shared {
    config: ClientConfig,
    url: Url,
    transport: Arc<dyn Transport>,
    reachability: Arc<dyn Reachability>,
    inner: Mutex<Inner>,
}

impl Shared {
    fn connect_locked(self: &Arc<Self>, inner: &mut Inner) {
        if inner.current.is_some() {
            trace!("connect() skipped, handle exists");
            return;
        }

        debug!(url = %self.url, "Opening telemetry socket");

        let id = HandleId::generate();
        match self.transport.open(&self.url, self.listener_for(id)) {
            Ok(handle) => {
                // A fresh handle supersedes any reconnect armed for the old one
                inner.cancel_reconnect_timer();
                inner.current = Some(Current { id, handle });
                inner.state = ConnectionState::Connecting;
            }
            Err(e) => {
                error!(url = %self.url, error = %e, "Telemetry socket open error");
                self.report_error(id, &e.to_string());
            }
        }
    }

    fn disconnect(&self) {
        let mut inner = self.inner.lock();
        debug!(url = %self.url, "Telemetry socket disconnect()");

        inner.cancel_reconnect_timer();

        if let Some(current) = inner.current.take() {
            // Unbind first so the close below cannot re-enter the state machine
            current.handle.unbind();
            inner.state = ConnectionState::Closing;
            current.handle.close();
        }

        inner.state = ConnectionState::Disconnected;
    }

    fn reconnect_locked(self: &Arc<Self>, inner: &mut Inner) {
        if !self.reachability.is_online() {
            debug!("Offline, reconnect skipped");
            return;
        }

        if let Some(current) = &inner.current
            && current.handle.ready_state() == ReadyState::Connecting
        {
            trace!(handle = %current.id, "Handshake in flight, reconnect skipped");
            return;
        }

        inner.cancel_reconnect_timer();
        inner.discard_handle();
        inner.state = ConnectionState::Disconnected;
        self.connect_locked(inner);
    }

    fn send<T>(self: &Arc<Self>, message: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        let text = match protocol::serialize(message) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to serialize telemetry message");
                return false;
            }
        };

        let mut inner = self.inner.lock();
        inner.buffer.push(text);

        if inner.is_connected() && self.reachability.is_online() {
            self.drain_locked(&mut inner);
            return true;
        }

        debug!(
            buffered = inner.buffer.len(),
            "Unable to send message, telemetry socket is not open"
        );
        self.reconnect_locked(&mut inner);
        false
    }

    pub(crate) fn heartbeat(self: &Arc<Self>, identity: &str) -> bool {
        let mut inner = self.inner.lock();

        let open = inner
            .current
            .as_ref()
            .filter(|current| current.handle.ready_state() == ReadyState::Open)
            .map(|current| Arc::clone(&current.handle));

        match open {
            Some(handle) => {
                let sent = HeartbeatPayload::new(identity)
                    .to_json()
                    .and_then(|text| handle.send(&text).map(|()| text));

                match sent {
                    Ok(text) => {
                        debug!(payload = %text, "Sent heartbeat to telemetry socket");
                        return true;
                    }
                    Err(e) => error!(error = %e, "Heartbeat send failed"),
                }
            }
            None => error!("Unable to send heartbeat, telemetry socket is not open"),
        }

        self.reconnect_locked(&mut inner);
        false
    }

    /// One pass over the buffer, head first.
    fn drain_locked(&self, inner: &mut Inner) {
        let Some(current) = &inner.current else {
            return;
        };
        let handle = Arc::clone(&current.handle);

        let outcome = inner.buffer.drain(|text| handle.send(text));

        if outcome.delivered > 0 {
            debug!(delivered = outcome.delivered, "Telemetry send success");
        }

        if let Some(e) = outcome.failure {
            error!(
                error = %e,
                remaining = inner.buffer.len(),
                "Drain pass interrupted, messages kept"
            );
        }
    }

    fn listener_for(self: &Arc<Self>, id: HandleId) -> Listener {
        let weak = Arc::downgrade(self);
        Arc::new(move |event| {
            if let Some(shared) = weak.upgrade() {
                shared.on_event(id, event);
            }
        })
    }

    fn on_event(self: &Arc<Self>, id: HandleId, event: TransportEvent) {
        let mut inner = self.inner.lock();

        if inner.current.as_ref().map(|current| current.id) != Some(id) {
            trace!(handle = %id, ?event, "Ignoring event from stale handle");
            return;
        }

        match event {
            TransportEvent::Opened => {
                debug!(url = %self.url, handle = %id, "Telemetry socket connected");
                inner.state = ConnectionState::Open;
                if self.reachability.is_online() && !inner.buffer.is_empty() {
                    self.drain_locked(&mut inner);
                }
            }

            TransportEvent::Closed { clean: true } => {
                debug!(url = %self.url, handle = %id, "Telemetry socket closed");
                inner.cancel_reconnect_timer();
                inner.current = None;
                inner.state = ConnectionState::Disconnected;
            }

            TransportEvent::Closed { clean: false } => {
                inner.current = None;
                inner.state = ConnectionState::Disconnected;

                if self.reachability.is_online() {
                    let delay_ms =
                        u64::try_from(self.config.reconnect_delay.as_millis()).unwrap_or(u64::MAX);
                    warn!(
                        url = %self.url,
                        delay_ms,
                        "Telemetry socket abrupt disconnection, reconnecting"
                    );
                    self.schedule_reconnect_locked(&mut inner);
                } else {
                    warn!(url = %self.url, "Telemetry socket abrupt disconnection while offline");
                }
            }

            TransportEvent::Message(text) => {
                info!(message = %text, "Received telemetry socket message");
            }

            TransportEvent::Error(message) => self.report_error(id, &message),
        }
    }

    /// Transport errors are logged only; the close that follows drives recovery.
    fn report_error(&self, id: HandleId, message: &str) {
        debug!(url = %self.url, handle = %id, error = %message, "Telemetry socket error");
    }

    fn schedule_reconnect_locked(self: &Arc<Self>, inner: &mut Inner) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("No tokio runtime, reconnect not scheduled");
            return;
        };

        inner.cancel_reconnect_timer();
        inner.timer_epoch += 1;

        let epoch = inner.timer_epoch;
        let delay = self.config.reconnect_delay;
        let weak: Weak<Self> = Arc::downgrade(self);

        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                shared.fire_reconnect_timer(epoch);
            }
        });

        inner.reconnect_timer = Some(ReconnectTimer { epoch, task });
    }

    fn fire_reconnect_timer(self: &Arc<Self>, epoch: u64) {
        let mut inner = self.inner.lock();

        if inner.reconnect_timer.as_ref().map(|timer| timer.epoch) != Some(epoch) {
            trace!(epoch, "Stale reconnect timer");
            return;
        }

        inner.reconnect_timer = None;
        debug!("Reconnect delay elapsed");
        self.connect_locked(&mut inner);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        inner.cancel_reconnect_timer();
        inner.discard_handle();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::reachability::NetworkStatus;
    use crate::transport::MemoryTransport;

    const URL: &str = "ws://collector.test/stats";
    const RECONNECT_DELAY: Duration = Duration::from_secs(5);

    fn client_with(transport: &MemoryTransport, network: &NetworkStatus) -> ResilientSocketClient {
        ResilientSocketClient::builder()
            .url(URL)
            .reconnect_delay(RECONNECT_DELAY)
            .transport(transport.clone())
            .reachability(network.clone())
            .build()
            .unwrap()
    }

    fn wire(message: &str) -> String {
        serde_json::to_string(message).unwrap()
    }

    /// Client with an open handle.
    fn open_client() -> (ResilientSocketClient, MemoryTransport, NetworkStatus) {
        let transport = MemoryTransport::new();
        let network = NetworkStatus::new(true);
        let client = client_with(&transport, &network);
        client.connect();
        transport.last_handle().unwrap().open();
        (client, transport, network)
    }

    #[test]
    fn test_new_client_is_idle() {
        let transport = MemoryTransport::new();
        let client = client_with(&transport, &NetworkStatus::new(true));

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_connected());
        assert_eq!(transport.open_count(), 0);
        assert_eq!(client.config().url, URL);
    }

    #[test]
    fn test_connect_is_idempotent_while_handle_exists() {
        let transport = MemoryTransport::new();
        let client = client_with(&transport, &NetworkStatus::new(true));

        client.connect();
        client.connect();

        assert_eq!(transport.open_count(), 1);
        assert_eq!(client.state(), ConnectionState::Connecting);
        assert_eq!(transport.last_handle().unwrap().url().as_str(), URL);
    }

    #[test]
    fn test_opened_transitions_to_open() {
        let (client, _transport, _network) = open_client();
        assert_eq!(client.state(), ConnectionState::Open);
        assert!(client.is_connected());
    }

    #[test]
    fn test_messages_buffered_while_disconnected_arrive_in_order() {
        let transport = MemoryTransport::new();
        let client = client_with(&transport, &NetworkStatus::new(true));

        assert!(!client.send("m1"));
        assert!(!client.send("m2"));
        assert!(!client.send("m3"));
        assert_eq!(client.buffered_len(), 3);
        // First send woke the client; later ones found the handshake in flight
        assert_eq!(transport.open_count(), 1);

        transport.last_handle().unwrap().open();

        assert_eq!(
            transport.last_handle().unwrap().sent(),
            vec![wire("m1"), wire("m2"), wire("m3")]
        );
        assert_eq!(client.buffered_len(), 0);
    }

    #[test]
    fn test_send_while_open_drains_immediately() {
        let (client, transport, _network) = open_client();

        assert!(client.send(&json!({ "event": "answered" })));
        assert_eq!(
            transport.last_handle().unwrap().sent(),
            vec![r#"{"event":"answered"}"#]
        );
        assert_eq!(client.buffered_len(), 0);
    }

    #[test]
    fn test_offline_send_keeps_message_and_does_not_reconnect() {
        let transport = MemoryTransport::new();
        let network = NetworkStatus::new(false);
        let client = client_with(&transport, &network);

        assert!(!client.send("m1"));
        assert_eq!(client.buffered_len(), 1);
        assert_eq!(transport.open_count(), 0);
    }

    #[test]
    fn test_offline_while_open_buffers_instead_of_sending() {
        let (client, transport, network) = open_client();
        network.set_online(false);

        assert!(!client.send("m1"));
        assert_eq!(client.buffered_len(), 1);
        assert!(transport.last_handle().unwrap().sent().is_empty());
        assert_eq!(transport.open_count(), 1);

        network.set_online(true);
        assert!(client.send("m2"));
        assert_eq!(
            transport.last_handle().unwrap().sent(),
            vec![wire("m1"), wire("m2")]
        );
    }

    #[test]
    fn test_reconnect_is_noop_while_offline() {
        let (client, transport, network) = open_client();
        network.set_online(false);

        client.reconnect();

        assert_eq!(transport.open_count(), 1);
        assert!(client.is_connected());
    }

    #[test]
    fn test_reconnect_replaces_open_handle() {
        let (client, transport, _network) = open_client();
        let first = transport.last_handle().unwrap();

        client.reconnect();

        assert_eq!(transport.open_count(), 2);
        assert!(!first.is_bound());
        assert_eq!(first.close_calls(), 1);
        assert_eq!(client.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_reconnect_keeps_handshake_in_flight() {
        let transport = MemoryTransport::new();
        let client = client_with(&transport, &NetworkStatus::new(true));

        client.connect();
        client.reconnect();

        assert_eq!(transport.open_count(), 1);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let transport = MemoryTransport::new();
        let client = client_with(&transport, &NetworkStatus::new(true));

        client.disconnect();
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);

        client.connect();
        let handle = transport.last_handle().unwrap();
        client.disconnect();
        client.disconnect();

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_connected());
        assert!(!handle.is_bound());
        assert_eq!(handle.close_calls(), 1);
    }

    #[test]
    fn test_disconnect_keeps_buffer() {
        let transport = MemoryTransport::new();
        let client = client_with(&transport, &NetworkStatus::new(true));

        client.send("m1");
        client.disconnect();
        assert_eq!(client.buffered_len(), 1);

        client.connect();
        transport.last_handle().unwrap().open();
        assert_eq!(transport.last_handle().unwrap().sent(), vec![wire("m1")]);
    }

    #[test]
    fn test_construction_failure_is_absorbed() {
        let transport = MemoryTransport::new();
        let client = client_with(&transport, &NetworkStatus::new(true));
        transport.fail_next_open("socket refused");

        client.connect();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.has_pending_reconnect());
        assert_eq!(transport.open_count(), 0);

        client.connect();
        assert_eq!(transport.open_count(), 1);
    }

    #[test]
    fn test_message_and_error_events_keep_state() {
        let (client, transport, _network) = open_client();
        let handle = transport.last_handle().unwrap();

        handle.deliver("{\"ack\":true}");
        handle.fail("transient");

        assert_eq!(client.state(), ConnectionState::Open);
        assert!(!client.has_pending_reconnect());
    }

    #[test]
    fn test_failed_send_mid_drain_keeps_remaining_messages() {
        let transport = MemoryTransport::new();
        let client = client_with(&transport, &NetworkStatus::new(true));

        client.send("m1");
        client.send("m2");
        client.send("m3");

        let handle = transport.last_handle().unwrap();
        handle.fail_sends_after(1);
        handle.open();

        assert_eq!(handle.sent(), vec![wire("m1")]);
        assert_eq!(client.buffered_len(), 2);

        handle.heal_sends();
        assert!(client.send("m4"));
        assert_eq!(
            handle.sent(),
            vec![wire("m1"), wire("m2"), wire("m3"), wire("m4")]
        );
    }

    #[test]
    fn test_unserializable_message_is_rejected() {
        let (client, _transport, _network) = open_client();
        let mut bad = std::collections::BTreeMap::new();
        bad.insert(vec![1u8], 1);

        assert!(!client.send(&bad));
        assert_eq!(client.buffered_len(), 0);
    }

    #[test]
    fn test_heartbeat_requires_open_connection() {
        let transport = MemoryTransport::new();
        let client = client_with(&transport, &NetworkStatus::new(true));

        assert!(!client.heartbeat("alice"));
        assert_eq!(client.buffered_len(), 0);
        // Not connected, so the heartbeat woke the client
        assert_eq!(transport.open_count(), 1);

        let handle = transport.last_handle().unwrap();
        assert!(!client.heartbeat("alice"));
        assert!(handle.sent().is_empty());

        handle.open();
        assert!(client.heartbeat("alice"));

        let sent = handle.sent();
        assert_eq!(sent.len(), 1);
        let payload: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(payload, json!({ "heartbeat": "healthy", "username": "alice" }));
        assert_eq!(client.buffered_len(), 0);
    }

    #[test]
    fn test_failed_heartbeat_send_reconnects() {
        let (client, transport, _network) = open_client();
        let handle = transport.last_handle().unwrap();
        handle.fail_sends_after(0);

        assert!(!client.heartbeat("alice"));
        assert!(handle.sent().is_empty());
        assert_eq!(client.buffered_len(), 0);

        // Open handle replaced by a fresh attempt
        assert_eq!(transport.open_count(), 2);
        assert_eq!(handle.close_calls(), 1);
        assert!(!handle.is_bound());
        assert_eq!(client.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_clones_share_connection() {
        let (client, transport, _network) = open_client();
        let other = client.clone();

        other.send("m1");
        assert_eq!(transport.last_handle().unwrap().sent(), vec![wire("m1")]);
        other.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_drop_closes_handle() {
        let (client, transport, _network) = open_client();
        let handle = transport.last_handle().unwrap();

        drop(client);

        assert!(!handle.is_bound());
        assert_eq!(handle.close_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abrupt_close_reconnects_after_delay() {
        let (client, transport, _network) = open_client();

        transport.last_handle().unwrap().close_abruptly();

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.has_pending_reconnect());
        assert_eq!(transport.open_count(), 1);

        tokio::time::sleep(RECONNECT_DELAY - Duration::from_millis(1)).await;
        assert_eq!(transport.open_count(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(transport.open_count(), 2);
        assert_eq!(client.state(), ConnectionState::Connecting);
        assert!(!client.has_pending_reconnect());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abrupt_close_with_maximal_delay_arms_timer() {
        let transport = MemoryTransport::new();
        let client = ResilientSocketClient::builder()
            .url(URL)
            .reconnect_delay(Duration::MAX)
            .transport(transport.clone())
            .reachability(NetworkStatus::new(true))
            .build()
            .unwrap();
        client.connect();
        transport.last_handle().unwrap().open();

        transport.last_handle().unwrap().close_abruptly();
        assert!(client.has_pending_reconnect());

        tokio::time::sleep(RECONNECT_DELAY).await;
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abrupt_close_while_offline_does_not_reconnect() {
        let (client, transport, network) = open_client();
        network.set_online(false);

        transport.last_handle().unwrap().close_abruptly();
        assert!(!client.has_pending_reconnect());

        tokio::time::sleep(RECONNECT_DELAY * 2).await;
        assert_eq!(transport.open_count(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_close_does_not_reconnect() {
        let (client, transport, _network) = open_client();

        transport.last_handle().unwrap().close_cleanly();

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.has_pending_reconnect());

        tokio::time::sleep(RECONNECT_DELAY * 2).await;
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_connect_disarms_reconnect_before_clean_close() {
        let (client, transport, _network) = open_client();

        transport.last_handle().unwrap().close_abruptly();
        assert!(client.has_pending_reconnect());

        client.connect();
        assert!(!client.has_pending_reconnect());

        let second = transport.last_handle().unwrap();
        second.open();
        second.close_cleanly();

        tokio::time::sleep(RECONNECT_DELAY * 2).await;
        assert_eq!(transport.open_count(), 2);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_pending_reconnect() {
        let (client, transport, _network) = open_client();

        transport.last_handle().unwrap().close_abruptly();
        assert!(client.has_pending_reconnect());

        client.disconnect();
        assert!(!client.has_pending_reconnect());

        tokio::time::sleep(RECONNECT_DELAY * 2).await;
        assert_eq!(transport.open_count(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffer_survives_reconnect() {
        let (client, transport, _network) = open_client();

        transport.last_handle().unwrap().close_abruptly();
        assert!(!client.send("while-down-1"));
        assert!(!client.send("while-down-2"));
        // send() reconnects at once and disarms the timer
        assert_eq!(transport.open_count(), 2);
        assert!(!client.has_pending_reconnect());

        tokio::time::sleep(RECONNECT_DELAY * 2).await;
        assert_eq!(transport.open_count(), 2);

        let handle = transport.last_handle().unwrap();
        handle.open();
        assert_eq!(
            handle.sent(),
            vec![wire("while-down-1"), wire("while-down-2")]
        );
    }

    #[tokio::test]
    async fn test_stale_handle_events_are_ignored() {
        let (client, transport, _network) = open_client();
        let first = transport.last_handle().unwrap();

        client.reconnect();
        let second = transport.last_handle().unwrap();

        // Late close from the discarded handle
        first.close_abruptly();
        assert_eq!(client.state(), ConnectionState::Connecting);
        assert!(!client.has_pending_reconnect());

        second.open();
        assert_eq!(client.state(), ConnectionState::Open);
    }

    // ------------------------------------------------------------------------
    // Over a real WebSocket
    // ------------------------------------------------------------------------

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_websocket_delivers_buffered_messages_in_order() {
        use futures_util::StreamExt;
        use tokio::net::TcpListener;
        use tokio::sync::mpsc;
        use tokio_tungstenite::accept_async;
        use tokio_tungstenite::tungstenite::Message;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(socket).await.unwrap();
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Text(text) = message {
                    let _ = frames_tx.send(text.as_str().to_owned());
                }
            }
        });

        let client = ResilientSocketClient::builder()
            .url(format!("ws://127.0.0.1:{port}"))
            .build()
            .unwrap();

        assert!(!client.send("m1"));
        assert!(!client.send("m2"));
        assert!(!client.send("m3"));

        for expected in ["m1", "m2", "m3"] {
            let frame = tokio::time::timeout(Duration::from_secs(5), frames_rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(frame, wire(expected));
        }
        assert_eq!(client.buffered_len(), 0);
        assert_eq!(client.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_websocket_reconnects_after_abrupt_close() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        use futures_util::StreamExt;
        use tokio::net::TcpListener;
        use tokio::sync::mpsc;
        use tokio_tungstenite::accept_async;
        use tokio_tungstenite::tungstenite::Message;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();

        let server_accepted = Arc::clone(&accepted);
        tokio::spawn(async move {
            // First session dies without a close handshake
            let (socket, _) = listener.accept().await.unwrap();
            let ws = accept_async(socket).await.unwrap();
            server_accepted.fetch_add(1, Ordering::SeqCst);
            drop(ws);

            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(socket).await.unwrap();
            server_accepted.fetch_add(1, Ordering::SeqCst);
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Text(text) = message {
                    let _ = frames_tx.send(text.as_str().to_owned());
                }
            }
        });

        let client = ResilientSocketClient::builder()
            .url(format!("ws://127.0.0.1:{port}"))
            .reconnect_delay(Duration::from_millis(50))
            .build()
            .unwrap();

        client.connect();
        wait_until(|| accepted.load(Ordering::SeqCst) == 2 && client.is_connected()).await;

        assert!(client.heartbeat("alice"));
        let frame = tokio::time::timeout(Duration::from_secs(5), frames_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(payload["username"], "alice");
    }

    proptest! {
        #[test]
        fn prop_buffered_messages_keep_fifo_order(
            before in proptest::collection::vec("[a-z0-9]{0,8}", 0..16),
            after in proptest::collection::vec("[a-z0-9]{0,8}", 0..16),
        ) {
            let transport = MemoryTransport::new();
            let client = client_with(&transport, &NetworkStatus::new(true));

            client.connect();
            for message in &before {
                prop_assert!(!client.send(message.as_str()));
            }

            let handle = transport.last_handle().unwrap();
            handle.open();
            for message in &after {
                prop_assert!(client.send(message.as_str()));
            }

            let expected: Vec<String> = before
                .iter()
                .chain(after.iter())
                .map(|message| wire(message))
                .collect();
            prop_assert_eq!(handle.sent(), expected);
            prop_assert_eq!(client.buffered_len(), 0);
        }
    }
}
