//! The STOMP protocol engine.
//!
//! [`Engine`] turns caller intents into frames and inbound frames into
//! [`Event`]s. All transport notifications are handled on one task spawned
//! by [`Engine::connect`]; caller operations only touch the shared
//! registry, the state cell and the current [`Connection`] handle, which is
//! swapped as a whole so a racing send sees either the live connection or
//! none at all.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::event::{ClientState, Event, EventStream, Message};
use crate::frame::{Command, Frame};
use crate::headers::HeaderAccessor;
use crate::heartbeat::negotiate_heartbeats;
use crate::subscription::{Subscription, SubscriptionRegistry};
use crate::transport::{Transport, TransportEvent};

/// Client-side STOMP engine over a pluggable [`Transport`].
///
/// Cloning yields another handle to the same engine. Operations never block:
/// they either act on local state or hand bytes to the transport, and report
/// failure through their return value rather than an error type.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    state: RwLock<ClientState>,
    connection: RwLock<Option<Arc<Connection>>>,
    registry: SubscriptionRegistry,
    events: broadcast::Sender<Event>,
}

impl Engine {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_registry(config, transport, SubscriptionRegistry::new())
    }

    /// Use a pre-built registry, e.g. one with a deterministic id generator.
    pub fn with_registry(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        registry: SubscriptionRegistry,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                state: RwLock::new(ClientState::NotConnected),
                connection: RwLock::new(None),
                registry,
                events,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ClientState {
        *self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ClientState::Connected
    }

    /// A new receiver on the event broadcast. Only events emitted after this
    /// call are seen.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.inner.registry.snapshot()
    }

    /// Open the transport and send `CONNECT` once it is up.
    ///
    /// Only acts from [`ClientState::NotConnected`]; any other state makes
    /// this a logged no-op returning `false`. The state becomes
    /// [`ClientState::Connecting`] immediately and
    /// [`ClientState::Connected`] when the broker answers `CONNECTED`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) -> bool {
        {
            let mut state = self.inner.state_mut();
            if *state != ClientState::NotConnected {
                debug!(state = ?*state, "connect ignored");
                return false;
            }
            *state = ClientState::Connecting;
        }

        let url = self.inner.config.url();
        let connect = self.inner.connect_frame();
        let (tx, rx) = mpsc::unbounded_channel();
        info!(url = %url, "connecting");
        tokio::spawn(run(self.inner.clone(), rx, connect));
        self.inner.transport.open(&url, tx);
        true
    }

    /// Send `payload` to `destination`. Returns whether the transport
    /// accepted the frame; `false` when there is no live connection.
    pub fn send(&self, destination: &str, payload: impl Into<Vec<u8>>) -> bool {
        let frame = Frame::new(Command::Send)
            .with_headers(HeaderAccessor::new().destination(destination).build())
            .set_body(payload);
        self.inner.send_frame(&frame)
    }

    /// Subscribe to `destination`.
    ///
    /// A destination that is already registered produces
    /// [`Event::SubscriptionAlreadyExists`] and no frame. If the `SUBSCRIBE`
    /// frame cannot be sent the registration is rolled back.
    pub fn subscribe(&self, destination: &str) -> bool {
        let id = match self.inner.registry.subscribe(destination) {
            Ok(id) => id,
            Err(e) => {
                debug!(error = %e, "subscribe rejected");
                self.inner.emit(Event::SubscriptionAlreadyExists);
                return false;
            }
        };

        let frame = Frame::new(Command::Subscribe).with_headers(
            HeaderAccessor::new()
                .subscription_id(id.as_str())
                .destination(destination)
                .build(),
        );
        if self.inner.send_frame(&frame) {
            debug!(destination, id = %id, "subscribed");
            true
        } else {
            self.inner.registry.unsubscribe(destination);
            false
        }
    }

    /// Unsubscribe from `destination`. Returns `false` without sending
    /// anything when the destination was never subscribed.
    pub fn unsubscribe(&self, destination: &str) -> bool {
        let Some(id) = self.inner.registry.unsubscribe(destination) else {
            debug!(destination, "unsubscribe of unknown destination");
            return false;
        };
        let frame = Frame::new(Command::Unsubscribe)
            .with_headers(HeaderAccessor::new().subscription_id(id).build());
        self.inner.send_frame(&frame)
    }

    /// Unsubscribe everything, send `DISCONNECT` and close gracefully.
    ///
    /// The state only moves to [`ClientState::Disconnected`] when the
    /// `DISCONNECT` frame was accepted; otherwise nothing changes and
    /// `false` is returned. [`Event::Disconnected`] follows once the
    /// transport reports the close.
    pub fn disconnect(&self) -> bool {
        for destination in self.inner.registry.destinations() {
            self.unsubscribe(&destination);
        }
        self.inner.registry.clear();

        if !self.inner.send_frame(&Frame::new(Command::Disconnect)) {
            debug!("DISCONNECT not sent");
            return false;
        }
        *self.inner.state_mut() = ClientState::Disconnected;
        if let Some(connection) = self.inner.connection() {
            connection.close();
        }
        info!("disconnected");
        true
    }
}

impl Inner {
    fn state_mut(&self) -> std::sync::RwLockWriteGuard<'_, ClientState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn connection(&self) -> Option<Arc<Connection>> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_connection(&self, connection: Option<Arc<Connection>>) -> Option<Arc<Connection>> {
        std::mem::replace(
            &mut *self.connection.write().unwrap_or_else(PoisonError::into_inner),
            connection,
        )
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            trace!("no event receivers");
        }
    }

    fn send_frame(&self, frame: &Frame) -> bool {
        match self.connection() {
            Some(connection) => connection.send_message(frame),
            None => {
                debug!(command = %frame.command, "no live connection");
                false
            }
        }
    }

    fn connect_frame(&self) -> Frame {
        let config = &self.config;
        let mut headers = HeaderAccessor::new()
            .host(config.host_header())
            .accept_version(config.accept_version.as_str())
            .login(config.login.as_deref())
            .passcode(config.passcode.as_deref());
        if config.heartbeat_enabled() {
            let (send, receive) = config.heart_beat();
            headers = headers.heart_beat(send, receive);
        }
        Frame::new(Command::Connect).with_headers(headers.build())
    }

    fn handle_frame(&self, connection: &Arc<Connection>, frame: Frame) {
        trace!(command = %frame.command, "inbound frame");
        match frame.command {
            Command::Connected => {
                {
                    let mut state = self.state_mut();
                    if *state == ClientState::Connecting {
                        *state = ClientState::Connected;
                    }
                }
                info!(version = frame.get_header("version").unwrap_or(""), "connected");
                self.emit(Event::Connected);
                self.setup_heartbeat(connection, &frame);
            }
            Command::Message => {
                let message = Message {
                    destination: frame.headers.destination().unwrap_or_default().to_string(),
                    raw_payload: String::from_utf8_lossy(&frame.body).into_owned(),
                    decoded: None,
                };
                trace!(destination = %message.destination, len = frame.body.len(), "message");
                self.emit(Event::Message(message));
            }
            Command::Error => {
                warn!(message = frame.headers.message().unwrap_or(""), "broker sent ERROR");
                self.emit(Event::Error(frame));
            }
            Command::Heartbeat => trace!("heartbeat received"),
            other => debug!(command = %other, "ignoring non-server frame"),
        }
    }

    fn setup_heartbeat(&self, connection: &Arc<Connection>, connected: &Frame) {
        let (server_send, server_receive) = connected.headers.heart_beat();
        let (client_send, client_receive) = self.config.heart_beat();
        let (write, read) =
            negotiate_heartbeats(client_send, client_receive, server_send, server_receive);
        debug!(
            client_send,
            client_receive,
            server_send,
            server_receive,
            write_ms = write.map(|d| d.as_millis() as u64),
            read_timeout_ms = read.map(|d| d.as_millis() as u64),
            "heartbeats negotiated"
        );

        if let Some(interval) = write {
            let weak = Arc::downgrade(connection);
            connection.on_write_inactivity(interval, move || {
                if let Some(connection) = weak.upgrade() {
                    connection.send_message(&Frame::heartbeat());
                }
            });
        }

        if let Some(timeout) = read {
            let weak = Arc::downgrade(connection);
            let timeout_ms = timeout.as_millis() as u64;
            connection.on_receive_inactivity(timeout, move || {
                let Some(connection) = weak.upgrade() else {
                    return;
                };
                warn!(timeout_ms, "read inactivity, closing");
                let error = Frame::new(Command::Error).with_headers(
                    HeaderAccessor::new()
                        .message(format!("No messages received in {} ms.", timeout_ms))
                        .build(),
                );
                connection.send_message(&error);
                connection.close();
            });
        }
    }

    fn teardown(&self) {
        if let Some(connection) = self.replace_connection(None) {
            connection.detach();
        }
        *self.state_mut() = ClientState::Disconnected;
        self.registry.clear();
        info!("connection gone");
        self.emit(Event::Disconnected);
    }
}

/// Consume transport notifications until the session ends.
async fn run(inner: Arc<Inner>, mut transport: mpsc::UnboundedReceiver<TransportEvent>, connect: Frame) {
    while let Some(event) = transport.recv().await {
        match event {
            TransportEvent::Opened(session) => {
                let connection = Arc::new(Connection::new(session));
                inner.replace_connection(Some(connection.clone()));
                debug!("transport open, sending CONNECT");
                if !connection.send_message(&connect) {
                    warn!("CONNECT frame not accepted by transport");
                }
            }
            TransportEvent::Message(bytes) => {
                let Some(connection) = inner.connection() else {
                    trace!("message without a live connection");
                    continue;
                };
                if let Some(frame) = connection.handle(&bytes) {
                    inner.handle_frame(&connection, frame);
                }
            }
            TransportEvent::Closing { code, reason } => {
                debug!(code, reason = %reason, "transport closing");
            }
            TransportEvent::Closed { code, reason } => {
                debug!(code, reason = %reason, "transport closed");
                break;
            }
            TransportEvent::Failure(error) => {
                warn!(error = %error, "transport failure");
                break;
            }
        }
    }
    inner.teardown();
}
