pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod engine;
pub mod event;
pub mod frame;
pub mod headers;
pub mod heartbeat;
pub mod parser;
pub mod subscription;
pub mod transport;

pub use client::{JsonCodec, PayloadCodec, PayloadError, StompClient};
pub use codec::{StompStreamCodec, decode, encode};
pub use config::ClientConfig;
pub use connection::{ConnError, Connection};
pub use engine::Engine;
pub use event::{ClientState, Event, EventStream, Message};
pub use frame::{Command, Frame, FrameError};
pub use headers::{HeaderAccessor, Headers, parse_heartbeat_header};
pub use heartbeat::{HeartbeatMonitor, negotiate_heartbeats};
pub use subscription::{IdGenerator, SubscribeError, Subscription, SubscriptionRegistry, UuidGenerator};
pub use transport::{
    MemoryPeer, MemoryTransport, TcpTransport, Transport, TransportEvent, TransportSession,
    WebSocketTransport,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoke_frame_display() {
        let f = Frame::new(Command::Send)
            .header("destination", "/queue/a")
            .set_body(b"hello".to_vec());
        let s = format!("{}", f);
        assert!(s.contains("SEND"));
        assert!(s.contains("Body (5 bytes)"));
    }
}
