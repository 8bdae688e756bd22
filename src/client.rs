//! Typed convenience layer over [`Engine`].
//!
//! The engine only moves opaque bytes; [`StompClient`] adds a
//! [`PayloadCodec`] so callers can send and observe typed values.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use crate::config::ClientConfig;
use crate::engine::Engine;
use crate::event::{ClientState, Event, EventStream, Message};
use crate::transport::Transport;

/// Payload (de)serialization failure.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("json payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Turns typed values into message bodies and back.
pub trait PayloadCodec: Send + Sync {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, PayloadError>;

    fn decode<T: DeserializeOwned>(&self, payload: &str) -> Result<T, PayloadError>;
}

/// JSON bodies via `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, PayloadError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, payload: &str) -> Result<T, PayloadError> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// An [`Engine`] paired with a payload codec.
pub struct StompClient<C = JsonCodec> {
    engine: Engine,
    codec: Arc<C>,
}

impl<C> Clone for StompClient<C> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl StompClient<JsonCodec> {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_codec(Engine::new(config, transport), JsonCodec)
    }
}

impl<C: PayloadCodec + 'static> StompClient<C> {
    pub fn with_codec(engine: Engine, codec: C) -> Self {
        Self {
            engine,
            codec: Arc::new(codec),
        }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn connect(&self) -> bool {
        self.engine.connect()
    }

    /// Encode `value` and send it to `destination`.
    ///
    /// `Err` only when encoding fails; `Ok(false)` when the engine could
    /// not hand the frame to the transport.
    pub fn send<T: Serialize + ?Sized>(
        &self,
        destination: &str,
        value: &T,
    ) -> Result<bool, PayloadError> {
        let body = self.codec.encode(value)?;
        Ok(self.engine.send(destination, body))
    }

    /// Send a string body as-is.
    pub fn send_text(&self, destination: &str, text: &str) -> bool {
        self.engine.send(destination, text.as_bytes().to_vec())
    }

    pub fn subscribe(&self, destination: &str) -> bool {
        self.engine.subscribe(destination)
    }

    pub fn unsubscribe(&self, destination: &str) -> bool {
        self.engine.unsubscribe(destination)
    }

    pub fn disconnect(&self) -> bool {
        self.engine.disconnect()
    }

    pub fn state(&self) -> ClientState {
        self.engine.state()
    }

    pub fn events(&self) -> EventStream {
        self.engine.events()
    }

    /// Events for a single destination with payloads decoded as `T`.
    ///
    /// `Message` events for other destinations are dropped; all other events
    /// pass through. A payload that fails to decode is logged and delivered
    /// with `decoded: None`.
    pub fn observe_topic<T>(
        &self,
        destination: &str,
    ) -> impl Stream<Item = Event<T>> + Send + Unpin + 'static
    where
        T: DeserializeOwned + Send + 'static,
    {
        let destination = destination.to_string();
        let codec = self.codec.clone();
        self.engine.events().into_stream().filter_map(move |event| {
            let event = match event {
                Event::Message(ref m) if m.destination != destination => None,
                other => Some(other.map_message(|m| decode_message(codec.as_ref(), m))),
            };
            futures::future::ready(event)
        })
    }
}

fn decode_message<C: PayloadCodec, T: DeserializeOwned>(codec: &C, message: Message) -> Message<T> {
    let decoded = match codec.decode(&message.raw_payload) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(destination = %message.destination, error = %e, "payload decode failed");
            None
        }
    };
    Message {
        destination: message.destination,
        raw_payload: message.raw_payload,
        decoded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Quote {
        symbol: String,
        price: u32,
    }

    #[test]
    fn json_codec_round_trips() {
        let quote = Quote {
            symbol: "ACME".into(),
            price: 42,
        };
        let bytes = JsonCodec.encode(&quote).unwrap();
        assert_eq!(bytes, br#"{"symbol":"ACME","price":42}"#);
        let back: Quote = JsonCodec.decode(std::str::from_utf8(&bytes).unwrap()).unwrap();
        assert_eq!(back, quote);
    }

    #[test]
    fn undecodable_payload_keeps_raw_text() {
        let message = Message {
            destination: "/topic/q".into(),
            raw_payload: "not json".into(),
            decoded: None,
        };
        let typed: Message<Quote> = decode_message(&JsonCodec, message);
        assert_eq!(typed.raw_payload, "not json");
        assert!(typed.decoded.is_none());
    }
}
