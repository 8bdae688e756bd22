//! Read/write inactivity detection.
//!
//! The [`HeartbeatMonitor`] owns two independent timers. Each one samples its
//! activity clock every `duration / 2` and calls back once the side has been
//! silent for longer than `duration`. Activity timestamps are only tracked
//! after the corresponding timer has been armed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// How much the negotiated server send interval is stretched before the
/// read side is declared dead.
pub const READ_TIMEOUT_MULTIPLIER: u32 = 3;

const UNARMED: u64 = u64::MAX;

/// Negotiate heartbeat intervals between client and server.
///
/// Parameters
/// - `client_send`, `client_receive`: the locally configured intervals in
///   milliseconds (the `heart-beat` pair sent in `CONNECT`).
/// - `server_send`, `server_receive`: the pair advertised in `CONNECTED`.
///
/// Returns `(write, read)`. A direction is active only when both sides
/// asked for it. The write interval is `max(client_send, server_receive)`;
/// the read timeout is `max(client_receive, server_send)` multiplied by
/// [`READ_TIMEOUT_MULTIPLIER`] to tolerate jitter.
pub fn negotiate_heartbeats(
    client_send: u64,
    client_receive: u64,
    server_send: u64,
    server_receive: u64,
) -> (Option<Duration>, Option<Duration>) {
    let write = (client_send > 0 && server_receive > 0)
        .then(|| Duration::from_millis(client_send.max(server_receive)));
    let read = (client_receive > 0 && server_send > 0).then(|| {
        Duration::from_millis(client_receive.max(server_send)) * READ_TIMEOUT_MULTIPLIER
    });
    (write, read)
}

/// Last-activity timestamp for one direction, as nanoseconds since the
/// monitor's origin on the monotonic clock.
#[derive(Debug)]
struct ActivityClock {
    origin: Instant,
    last: AtomicU64,
}

impl ActivityClock {
    fn new(origin: Instant) -> Self {
        Self {
            origin,
            last: AtomicU64::new(UNARMED),
        }
    }

    fn now(&self) -> u64 {
        Instant::now().duration_since(self.origin).as_nanos() as u64
    }

    fn arm(&self) {
        self.last.store(self.now(), Ordering::SeqCst);
    }

    /// No-op until armed.
    fn touch(&self) {
        if self.last.load(Ordering::SeqCst) != UNARMED {
            self.last.store(self.now(), Ordering::SeqCst);
        }
    }

    fn idle(&self) -> Duration {
        let last = self.last.load(Ordering::SeqCst);
        if last == UNARMED {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.now().saturating_sub(last))
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Read,
    Write,
}

/// Two replaceable inactivity timers, one per direction.
///
/// Registering requires a Tokio runtime; the checks run on spawned tasks and
/// the callbacks execute there. Dropping the monitor stops both timers.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    read: Arc<ActivityClock>,
    write: Arc<ActivityClock>,
    read_timer: Mutex<Option<JoinHandle<()>>>,
    write_timer: Mutex<Option<JoinHandle<()>>>,
}

impl Default for HeartbeatMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatMonitor {
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            read: Arc::new(ActivityClock::new(origin)),
            write: Arc::new(ActivityClock::new(origin)),
            read_timer: Mutex::new(None),
            write_timer: Mutex::new(None),
        }
    }

    /// Record inbound traffic.
    pub fn record_read(&self) {
        self.read.touch();
    }

    /// Record outbound traffic.
    pub fn record_write(&self) {
        self.write.touch();
    }

    /// Call `callback` whenever nothing has been read for longer than
    /// `duration`. Replaces any previous read timer.
    ///
    /// # Panics
    ///
    /// Panics if `duration` is zero.
    pub fn on_read_inactivity<F>(&self, duration: Duration, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register(Side::Read, duration, callback);
    }

    /// Call `callback` whenever nothing has been written for longer than
    /// `duration`. Replaces any previous write timer.
    ///
    /// # Panics
    ///
    /// Panics if `duration` is zero.
    pub fn on_write_inactivity<F>(&self, duration: Duration, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register(Side::Write, duration, callback);
    }

    /// Whether a timer is currently registered for reads / writes.
    pub fn is_active(&self) -> (bool, bool) {
        let active = |slot: &Mutex<Option<JoinHandle<()>>>| {
            slot.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .as_ref()
                .is_some_and(|h| !h.is_finished())
        };
        (active(&self.read_timer), active(&self.write_timer))
    }

    /// Cancel both timers. Idempotent.
    pub fn stop(&self) {
        for slot in [&self.read_timer, &self.write_timer] {
            if let Some(handle) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
                handle.abort();
            }
        }
    }

    fn register<F>(&self, side: Side, duration: Duration, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        assert!(!duration.is_zero(), "inactivity duration must be greater than zero");

        let (clock, slot) = match side {
            Side::Read => (self.read.clone(), &self.read_timer),
            Side::Write => (self.write.clone(), &self.write_timer),
        };
        clock.arm();

        let period = (duration / 2).max(Duration::from_millis(1));
        debug!(?side, duration_ms = duration.as_millis() as u64, "arming inactivity timer");
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let idle = clock.idle();
                if idle > duration {
                    trace!(?side, idle_ms = idle.as_millis() as u64, "inactivity detected");
                    callback();
                }
            }
        });

        if let Some(previous) = slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            previous.abort();
        }
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
