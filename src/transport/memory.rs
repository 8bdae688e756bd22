//! In-process transport whose far end is driven by a [`MemoryPeer`].
//!
//! Useful for tests and for wiring the engine to something that is not a
//! socket. The peer plays the broker: it sees every client write and can
//! inject frames, close or fail the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use super::{EventSender, NORMAL_CLOSURE, Transport, TransportEvent, TransportSession};
use crate::codec;
use crate::frame::Frame;

/// What the peer observes from the client side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerInbound {
    /// Raw bytes written by the client.
    Data(Bytes),
    /// The client closed gracefully.
    Closed { code: u16, reason: String },
    /// The client cancelled the session.
    Canceled,
}

type EventSlot = Arc<Mutex<Option<EventSender>>>;

/// Client-side provider.
#[derive(Debug)]
pub struct MemoryTransport {
    reachable: bool,
    events: EventSlot,
    to_peer: mpsc::UnboundedSender<PeerInbound>,
}

impl MemoryTransport {
    /// A connected transport/peer pair.
    pub fn pair() -> (Arc<MemoryTransport>, MemoryPeer) {
        Self::build(true)
    }

    /// A transport whose `open` always fails.
    pub fn unreachable() -> (Arc<MemoryTransport>, MemoryPeer) {
        Self::build(false)
    }

    fn build(reachable: bool) -> (Arc<MemoryTransport>, MemoryPeer) {
        let events: EventSlot = Arc::new(Mutex::new(None));
        let (to_peer, from_client) = mpsc::unbounded_channel();
        let transport = Arc::new(MemoryTransport {
            reachable,
            events: events.clone(),
            to_peer,
        });
        let peer = MemoryPeer {
            events,
            from_client,
        };
        (transport, peer)
    }
}

impl Transport for MemoryTransport {
    fn open(&self, url: &str, events: EventSender) {
        if !self.reachable {
            debug!(url, "memory transport unreachable");
            let _ = events.send(TransportEvent::Failure(format!("connection refused: {}", url)));
            return;
        }
        let session = Arc::new(MemorySession {
            closed: AtomicBool::new(false),
            events: events.clone(),
            to_peer: self.to_peer.clone(),
        });
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = Some(events.clone());
        let _ = events.send(TransportEvent::Opened(session));
    }
}

#[derive(Debug)]
struct MemorySession {
    closed: AtomicBool,
    events: EventSender,
    to_peer: mpsc::UnboundedSender<PeerInbound>,
}

impl TransportSession for MemorySession {
    fn send(&self, data: Bytes) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        self.to_peer.send(PeerInbound::Data(data)).is_ok()
    }

    fn close(&self, code: u16, reason: &str) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _ = self.to_peer.send(PeerInbound::Closed {
            code,
            reason: reason.to_string(),
        });
        let _ = self.events.send(TransportEvent::Closed {
            code,
            reason: reason.to_string(),
        });
        true
    }

    fn cancel(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.to_peer.send(PeerInbound::Canceled);
        let _ = self.events.send(TransportEvent::Failure("canceled".into()));
    }
}

/// Broker side of a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryPeer {
    events: EventSlot,
    from_client: mpsc::UnboundedReceiver<PeerInbound>,
}

impl MemoryPeer {
    fn emit(&self, event: TransportEvent) -> bool {
        match self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Deliver raw bytes to the client as one transport message.
    pub fn send_raw(&self, data: impl Into<Bytes>) -> bool {
        self.emit(TransportEvent::Message(data.into()))
    }

    /// Encode and deliver a frame to the client.
    pub fn send_frame(&self, frame: &Frame) -> bool {
        self.send_raw(codec::encode(frame))
    }

    /// Close from the broker side.
    pub fn close(&self, reason: &str) -> bool {
        self.emit(TransportEvent::Closing {
            code: NORMAL_CLOSURE,
            reason: reason.to_string(),
        }) && self.emit(TransportEvent::Closed {
            code: NORMAL_CLOSURE,
            reason: reason.to_string(),
        })
    }

    /// Simulate a transport failure.
    pub fn fail(&self, error: &str) -> bool {
        self.emit(TransportEvent::Failure(error.to_string()))
    }

    /// Next thing the client did, or `None` once the transport is gone.
    pub async fn recv(&mut self) -> Option<PeerInbound> {
        self.from_client.recv().await
    }

    /// Next thing the client did, if any is already queued.
    pub fn try_recv(&mut self) -> Option<PeerInbound> {
        self.from_client.try_recv().ok()
    }

    /// Next frame written by the client, decoded. Closes and cancels are
    /// skipped.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        loop {
            match self.from_client.recv().await? {
                PeerInbound::Data(bytes) => return codec::decode(&bytes),
                PeerInbound::Closed { .. } | PeerInbound::Canceled => continue,
            }
        }
    }

    /// Drain every frame already written by the client.
    pub fn drain_frames(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(item) = self.from_client.try_recv() {
            if let PeerInbound::Data(bytes) = item {
                frames.extend(codec::decode(&bytes));
            }
        }
        frames
    }
}
