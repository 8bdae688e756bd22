//! WebSocket transport built on `tokio-tungstenite`.
//!
//! Encoded STOMP frames that are valid UTF-8 travel as text messages,
//! anything else as binary. Each inbound message is reported as one
//! [`TransportEvent::Message`].

use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};

use super::{
    ABNORMAL_CLOSURE, ChannelSession, EventSender, NORMAL_CLOSURE, NORMAL_CLOSURE_REASON,
    Outbound, Transport, TransportEvent, failure,
};
use crate::connection::ConnError;

/// Opens `ws://` and `wss://` sessions.
#[derive(Debug, Default, Clone)]
pub struct WebSocketTransport {}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self {}
    }
}

impl Transport for WebSocketTransport {
    fn open(&self, url: &str, events: EventSender) {
        let url = url.to_string();
        tokio::spawn(async move {
            debug!(url = %url, "opening websocket");
            match connect_async(url.as_str()).await {
                Ok((ws, _response)) => {
                    let (session, out_rx, cancel) = ChannelSession::new();
                    if events.send(TransportEvent::Opened(Arc::new(session))).is_err() {
                        return;
                    }
                    drive(ws, out_rx, cancel, events).await;
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "websocket open failed");
                    let _ = events.send(failure(ConnError::Transport(e.to_string())));
                }
            }
        });
    }
}

/// Single task owning the socket: serializes writes and reports reads.
async fn drive(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    cancel: Arc<Notify>,
    events: EventSender,
) {
    let (mut sink, mut stream) = ws.split();
    let mut close_sent = false;

    loop {
        tokio::select! {
            _ = cancel.notified() => {
                debug!("websocket canceled");
                let _ = events.send(TransportEvent::Failure("canceled".into()));
                return;
            }
            out = outbound.recv() => match out {
                Some(Outbound::Data(bytes)) => {
                    let msg = match std::str::from_utf8(&bytes) {
                        Ok(text) => Message::Text(text.to_owned()),
                        Err(_) => Message::Binary(bytes.to_vec()),
                    };
                    if let Err(e) = sink.send(msg).await {
                        let _ = events.send(failure(ConnError::Transport(e.to_string())));
                        return;
                    }
                }
                Some(Outbound::Close { code, reason }) => {
                    close_sent = true;
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    };
                    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                        let _ = events.send(failure(ConnError::Transport(e.to_string())));
                        return;
                    }
                }
                None => {
                    // every session handle dropped
                    let _ = sink.close().await;
                    let _ = events.send(TransportEvent::Closed {
                        code: NORMAL_CLOSURE,
                        reason: NORMAL_CLOSURE_REASON.into(),
                    });
                    return;
                }
            },
            item = stream.next() => match item {
                Some(Ok(Message::Text(text))) => {
                    trace!(len = text.len(), "websocket text message");
                    let _ = events.send(TransportEvent::Message(Bytes::from(text)));
                }
                Some(Ok(Message::Binary(data))) => {
                    trace!(len = data.len(), "websocket binary message");
                    let _ = events.send(TransportEvent::Message(Bytes::from(data)));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.into_owned()))
                        .unwrap_or((NORMAL_CLOSURE, String::new()));
                    if !close_sent {
                        let _ = events.send(TransportEvent::Closing { code, reason: reason.clone() });
                    }
                    // flushes the automatic close reply
                    let _ = sink.flush().await;
                    let _ = events.send(TransportEvent::Closed { code, reason });
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = events.send(failure(ConnError::Transport(e.to_string())));
                    return;
                }
                None => {
                    let _ = events.send(TransportEvent::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: "connection dropped".into(),
                    });
                    return;
                }
            }
        }
    }
}
