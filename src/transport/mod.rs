//! Byte-stream transports the engine runs over.
//!
//! A [`Transport`] opens a session asynchronously and reports everything
//! that happens to it as [`TransportEvent`]s on the channel it was given.
//! The engine consumes those events on a single task, so no engine state is
//! touched from a transport's own tasks.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::sync::{Notify, mpsc};

use crate::connection::ConnError;

pub mod memory;
pub mod tcp;
pub mod websocket;

pub use memory::{MemoryPeer, MemoryTransport, PeerInbound};
pub use tcp::TcpTransport;
pub use websocket::WebSocketTransport;

/// WebSocket close code for a normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Reason sent with [`NORMAL_CLOSURE`].
pub const NORMAL_CLOSURE_REASON: &str = "Normal closure";
/// Close code reported when the peer vanished without a closing handshake.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Sender half handed to [`Transport::open`].
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// An open session on a transport.
///
/// All methods are non-blocking: `send` hands the bytes to the transport's
/// writer and reports whether they were accepted for delivery, not whether
/// they arrived.
pub trait TransportSession: Send + Sync + fmt::Debug {
    fn send(&self, data: Bytes) -> bool;

    /// Start a graceful close. Returns `false` if the session was already
    /// closed.
    fn close(&self, code: u16, reason: &str) -> bool;

    /// Tear the session down immediately, without a closing handshake.
    fn cancel(&self);
}

/// Failure notification carrying a classified error.
pub(crate) fn failure(error: ConnError) -> TransportEvent {
    TransportEvent::Failure(error.to_string())
}

/// Lifecycle and data notifications from a transport session.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Opened(Arc<dyn TransportSession>),
    /// One inbound text or binary message.
    Message(Bytes),
    /// The peer started a closing handshake.
    Closing { code: u16, reason: String },
    Closed { code: u16, reason: String },
    /// Open failure or mid-session failure.
    Failure(String),
}

/// Provider of transport sessions.
pub trait Transport: Send + Sync {
    /// Begin opening a session to `url`. Must not block; success, data and
    /// failure are all reported through `events`.
    fn open(&self, url: &str, events: EventSender);
}

/// Requests from a [`ChannelSession`] to the task that owns the socket.
#[derive(Debug)]
pub(crate) enum Outbound {
    Data(Bytes),
    Close { code: u16, reason: String },
}

/// Session handle for socket transports: writes are queued to the single
/// task that owns the socket, which keeps them in order and untorn.
#[derive(Debug)]
pub(crate) struct ChannelSession {
    outbound: mpsc::UnboundedSender<Outbound>,
    closed: AtomicBool,
    cancel: Arc<Notify>,
}

impl ChannelSession {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>, Arc<Notify>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = Arc::new(Notify::new());
        let session = Self {
            outbound: tx,
            closed: AtomicBool::new(false),
            cancel: cancel.clone(),
        };
        (session, rx, cancel)
    }
}

impl TransportSession for ChannelSession {
    fn send(&self, data: Bytes) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        self.outbound.send(Outbound::Data(data)).is_ok()
    }

    fn close(&self, code: u16, reason: &str) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.outbound
            .send(Outbound::Close {
                code,
                reason: reason.to_string(),
            })
            .is_ok()
    }

    fn cancel(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.cancel.notify_one();
    }
}
