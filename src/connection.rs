use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::codec;
use crate::frame::Frame;
use crate::heartbeat::HeartbeatMonitor;
use crate::transport::{NORMAL_CLOSURE, NORMAL_CLOSURE_REASON, TransportSession};

/// Errors returned by transports and connection setup.
#[derive(Error, Debug)]
pub enum ConnError {
    /// I/O-level error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Transport-level failure (open refused, socket dropped, ...)
    #[error("transport error: {0}")]
    Transport(String),
    /// Protocol-level error
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// One live transport session plus its heartbeat monitor.
///
/// Every outbound frame goes through [`Connection::send_message`], so
/// caller threads and heartbeat callbacks share a single write path. Once
/// closed (either way) the connection refuses further writes.
#[derive(Debug)]
pub struct Connection {
    session: Arc<dyn TransportSession>,
    monitor: HeartbeatMonitor,
    closed: AtomicBool,
}

impl Connection {
    pub fn new(session: Arc<dyn TransportSession>) -> Self {
        Self {
            session,
            monitor: HeartbeatMonitor::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Encode `frame` and hand it to the transport.
    ///
    /// Returns whether the transport accepted the bytes for delivery. Frames
    /// that break the command's body/destination rules are refused.
    pub fn send_message(&self, frame: &Frame) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            debug!(command = %frame.command, "send on closed connection");
            return false;
        }
        if let Err(e) = frame.validate() {
            warn!(error = %e, "refusing invalid frame");
            return false;
        }
        self.monitor.record_write();
        trace!(command = %frame.command, "sending frame");
        self.session.send(codec::encode(frame))
    }

    /// Record read activity and decode one inbound transport message.
    pub fn handle(&self, raw: &[u8]) -> Option<Frame> {
        self.monitor.record_read();
        codec::decode(raw)
    }

    /// Fire `callback` after `duration` without inbound traffic.
    ///
    /// # Panics
    ///
    /// Panics if `duration` is zero.
    pub fn on_receive_inactivity<F>(&self, duration: Duration, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.monitor.on_read_inactivity(duration, callback);
    }

    /// Fire `callback` after `duration` without outbound traffic.
    ///
    /// # Panics
    ///
    /// Panics if `duration` is zero.
    pub fn on_write_inactivity<F>(&self, duration: Duration, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.monitor.on_write_inactivity(duration, callback);
    }

    /// `(read, write)` timer activity, mostly for diagnostics.
    pub fn heartbeats_active(&self) -> (bool, bool) {
        self.monitor.is_active()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Graceful shutdown: normal-closure handshake, timers stopped.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("closing connection");
        self.monitor.stop();
        self.session.close(NORMAL_CLOSURE, NORMAL_CLOSURE_REASON);
    }

    /// Abrupt teardown without a closing handshake.
    pub fn force_close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("force-closing connection");
        self.monitor.stop();
        self.session.cancel();
    }

    /// The transport already went away: stop timers and refuse writes
    /// without touching the session.
    pub(crate) fn detach(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.monitor.stop();
    }
}
