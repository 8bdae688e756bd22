use futures::Stream;
use tokio::sync::broadcast;
use tracing::warn;

use crate::frame::Frame;

/// Lifecycle of an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientState {
    #[default]
    NotConnected,
    /// The transport open was requested; no `CONNECTED` frame yet.
    Connecting,
    Connected,
    /// Terminal. A new connection needs a new engine.
    Disconnected,
}

/// A `MESSAGE` frame as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<T = ()> {
    /// `destination` header, empty when the broker omitted it.
    pub destination: String,
    /// Body decoded as UTF-8 (lossy).
    pub raw_payload: String,
    /// Typed value; always `None` when coming straight from the engine.
    pub decoded: Option<T>,
}

/// Notifications produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<T = ()> {
    Connected,
    Message(Message<T>),
    /// The broker sent an `ERROR` frame; carried as received.
    Error(Frame),
    Disconnected,
    /// `subscribe` was called for a destination that is already registered.
    SubscriptionAlreadyExists,
}

impl<T> Event<T> {
    /// Change the decoded payload type, leaving every other event as-is.
    pub fn map_message<U>(self, f: impl FnOnce(Message<T>) -> Message<U>) -> Event<U> {
        match self {
            Event::Connected => Event::Connected,
            Event::Message(m) => Event::Message(f(m)),
            Event::Error(frame) => Event::Error(frame),
            Event::Disconnected => Event::Disconnected,
            Event::SubscriptionAlreadyExists => Event::SubscriptionAlreadyExists,
        }
    }
}

/// Receiving side of the engine's event broadcast.
///
/// The buffer is bounded; a receiver that falls behind loses the oldest
/// events (logged) instead of slowing the engine down.
#[derive(Debug)]
pub struct EventStream {
    rx: broadcast::Receiver<Event>,
}

impl EventStream {
    pub(crate) fn new(rx: broadcast::Receiver<Event>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the engine is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event consumer lagging, oldest events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-buffered event, if any.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "event consumer lagging, oldest events dropped");
                }
                Err(_) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Event> + Send + Unpin + 'static {
        Box::pin(futures::stream::unfold(self, |mut events| async move {
            events.recv().await.map(|event| (event, events))
        }))
    }
}
