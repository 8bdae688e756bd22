//! Raw STOMP over TCP.
//!
//! The byte stream is split into whole wire frames by
//! [`StompStreamCodec`](crate::codec::StompStreamCodec) so the engine sees
//! the same one-message-per-frame shape as over WebSocket. TCP has no
//! closing handshake: a graceful close flushes pending writes and shuts the
//! write half down.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc};
use tokio_util::codec::Framed;
use tracing::{debug, trace, warn};

use super::{
    ABNORMAL_CLOSURE, ChannelSession, EventSender, Outbound, Transport, TransportEvent, failure,
};
use crate::codec::StompStreamCodec;
use crate::connection::ConnError;

/// Opens TCP sessions to `host:port` or `tcp://host:port[/...]`.
#[derive(Debug, Default, Clone)]
pub struct TcpTransport {}

impl TcpTransport {
    pub fn new() -> Self {
        Self {}
    }
}

/// Strip the scheme and any path from `url`, leaving `host:port`.
pub fn socket_address(url: &str) -> &str {
    let rest = url.strip_prefix("tcp://").unwrap_or(url);
    rest.split('/').next().unwrap_or(rest)
}

impl Transport for TcpTransport {
    fn open(&self, url: &str, events: EventSender) {
        let addr = socket_address(url).to_string();
        tokio::spawn(async move {
            debug!(addr = %addr, "opening tcp connection");
            match TcpStream::connect(&addr).await {
                Ok(stream) => {
                    let (session, out_rx, cancel) = ChannelSession::new();
                    if events.send(TransportEvent::Opened(Arc::new(session))).is_err() {
                        return;
                    }
                    drive(Framed::new(stream, StompStreamCodec::new()), out_rx, cancel, events)
                        .await;
                }
                Err(e) => {
                    warn!(addr = %addr, error = %e, "tcp connect failed");
                    let _ = events.send(failure(ConnError::Io(e)));
                }
            }
        });
    }
}

async fn drive(
    framed: Framed<TcpStream, StompStreamCodec>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    cancel: Arc<Notify>,
    events: EventSender,
) {
    let (mut sink, mut stream) = framed.split();

    loop {
        tokio::select! {
            _ = cancel.notified() => {
                debug!("tcp session canceled");
                let _ = events.send(TransportEvent::Failure("canceled".into()));
                return;
            }
            out = outbound.recv() => match out {
                Some(Outbound::Data(bytes)) => {
                    if let Err(e) = sink.send(bytes).await {
                        let _ = events.send(failure(ConnError::Io(e)));
                        return;
                    }
                }
                Some(Outbound::Close { code, reason }) => {
                    let _ = sink.close().await;
                    let _ = events.send(TransportEvent::Closed { code, reason });
                    return;
                }
                None => {
                    let _ = sink.close().await;
                    return;
                }
            },
            item = stream.next() => match item {
                Some(Ok(frame)) => {
                    trace!(len = frame.len(), "tcp frame");
                    let _ = events.send(TransportEvent::Message(frame));
                }
                Some(Err(e)) => {
                    let error = match e.kind() {
                        std::io::ErrorKind::InvalidData => ConnError::Protocol(e.to_string()),
                        _ => ConnError::Io(e),
                    };
                    warn!(error = %error, "tcp read failed");
                    let _ = events.send(failure(error));
                    return;
                }
                None => {
                    let _ = events.send(TransportEvent::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: "connection closed by peer".into(),
                    });
                    return;
                }
            }
        }
    }
}
