/// Default `accept-version` header value.
pub const DEFAULT_ACCEPT_VERSION: &str = "1.1,1.2";
/// Default capacity of the event broadcast buffer.
pub const DEFAULT_EVENT_BUFFER: usize = 16;

/// Connection settings for an [`Engine`](crate::Engine).
///
/// Built with [`ClientConfig::new`] and chained setters:
///
/// ```
/// use stomp_engine::ClientConfig;
///
/// let config = ClientConfig::new("localhost", 15674)
///     .path("/ws")
///     .credentials("guest", "guest")
///     .heartbeat(10_000, 10_000);
/// assert_eq!(config.url(), "ws://localhost:15674/ws");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Path appended to `ws://host:port`; empty by default.
    pub path: String,
    /// Full URL overriding `host`/`port`/`path` for the transport.
    pub endpoint: Option<String>,
    pub accept_version: String,
    /// Value of the `host` header; the endpoint URL when unset.
    pub virtual_host: Option<String>,
    pub login: Option<String>,
    pub passcode: Option<String>,
    /// Outbound heartbeat interval in milliseconds, 0 disables.
    pub heartbeat_send_interval: u64,
    /// Expected inbound heartbeat interval in milliseconds, 0 disables.
    pub heartbeat_receive_interval: u64,
    pub event_buffer: usize,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: String::new(),
            endpoint: None,
            accept_version: DEFAULT_ACCEPT_VERSION.to_string(),
            virtual_host: None,
            login: None,
            passcode: None,
            heartbeat_send_interval: 0,
            heartbeat_receive_interval: 0,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    pub fn accept_version(mut self, version: impl Into<String>) -> Self {
        self.accept_version = version.into();
        self
    }

    pub fn virtual_host(mut self, host: impl Into<String>) -> Self {
        self.virtual_host = Some(host.into());
        self
    }

    pub fn login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    pub fn passcode(mut self, passcode: impl Into<String>) -> Self {
        self.passcode = Some(passcode.into());
        self
    }

    pub fn credentials(self, login: impl Into<String>, passcode: impl Into<String>) -> Self {
        self.login(login).passcode(passcode)
    }

    /// Heartbeat intervals in milliseconds; 0 disables a direction.
    pub fn heartbeat(mut self, send_ms: u64, receive_ms: u64) -> Self {
        self.heartbeat_send_interval = send_ms;
        self.heartbeat_receive_interval = receive_ms;
        self
    }

    /// Capacity of the event broadcast buffer (at least 1).
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    /// URL handed to the transport.
    pub fn url(&self) -> String {
        match &self.endpoint {
            Some(url) => url.clone(),
            None => format!("ws://{}:{}{}", self.host, self.port, self.path),
        }
    }

    /// `host` header for `CONNECT`.
    pub fn host_header(&self) -> String {
        self.virtual_host.clone().unwrap_or_else(|| self.url())
    }

    /// `(send, receive)` pair advertised in `CONNECT`.
    pub fn heart_beat(&self) -> (u64, u64) {
        (self.heartbeat_send_interval, self.heartbeat_receive_interval)
    }

    pub fn heartbeat_enabled(&self) -> bool {
        self.heartbeat_send_interval > 0 || self.heartbeat_receive_interval > 0
    }
}
