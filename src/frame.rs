use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::headers::Headers;

/// STOMP commands understood by this client.
///
/// Client-originated: `CONNECT`, `DISCONNECT`, `SEND`, `SUBSCRIBE`, `UNSUBSCRIBE`.
/// Server-originated: `CONNECTED`, `MESSAGE`, `ERROR`. `HEARTBEAT` travels in
/// both directions and is the empty frame (a single LF on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Connect,
    Disconnect,
    Send,
    Subscribe,
    Unsubscribe,
    Connected,
    Message,
    Error,
    Heartbeat,
}

impl Command {
    /// Only `SEND`, `MESSAGE` and `ERROR` may carry a body.
    pub fn body_allowed(self) -> bool {
        matches!(self, Command::Send | Command::Message | Command::Error)
    }

    /// `SEND` and `SUBSCRIBE` must name a destination.
    pub fn destination_required(self) -> bool {
        matches!(self, Command::Send | Command::Subscribe)
    }

    /// The command line as written on the wire. `HEARTBEAT` has no command
    /// line; its name is only used for display.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Disconnect => "DISCONNECT",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Connected => "CONNECTED",
            Command::Message => "MESSAGE",
            Command::Error => "ERROR",
            Command::Heartbeat => "HEARTBEAT",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a command line does not name a known [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown STOMP command '{0}'")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Command::Connect),
            "DISCONNECT" => Ok(Command::Disconnect),
            "SEND" => Ok(Command::Send),
            "SUBSCRIBE" => Ok(Command::Subscribe),
            "UNSUBSCRIBE" => Ok(Command::Unsubscribe),
            "CONNECTED" => Ok(Command::Connected),
            "MESSAGE" => Ok(Command::Message),
            "ERROR" => Ok(Command::Error),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// Violations of the per-command frame invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("{0} frames must not carry a body")]
    BodyNotAllowed(Command),
    #[error("{0} frames require a destination header")]
    MissingDestination(Command),
}

/// A simple representation of a STOMP frame.
///
/// `Frame` contains the command, an ordered header multimap and the raw
/// body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// STOMP command
    pub command: Command,
    /// Ordered headers; lookups return the first value for a name
    pub headers: Headers,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl Frame {
    /// Create a new frame with the given command and empty headers/body.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// The empty heartbeat frame.
    pub fn heartbeat() -> Self {
        Self::new(Command::Heartbeat)
    }

    /// Add a header (builder style). Duplicates are kept; lookups see the
    /// first one.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(key, value);
        self
    }

    /// Replace the whole header set (builder style).
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Set the frame body (builder style).
    ///
    /// The body is only written for commands where
    /// [`Command::body_allowed`] holds; see [`Frame::validate`].
    pub fn set_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Get the value of a header by name.
    ///
    /// Returns the first header value matching the given key (case-sensitive),
    /// or `None` if no such header exists.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// Check the body-allowed and destination-required facts of the command.
    pub fn validate(&self) -> Result<(), FrameError> {
        if !self.body.is_empty() && !self.command.body_allowed() {
            return Err(FrameError::BodyNotAllowed(self.command));
        }
        if self.command.destination_required() && self.headers.destination().is_none() {
            return Err(FrameError::MissingDestination(self.command));
        }
        Ok(())
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Command: {}", self.command)?;
        for (k, v) in self.headers.iter() {
            writeln!(f, "{}: {}", k, v)?;
        }
        writeln!(f, "Body ({} bytes)", self.body.len())
    }
}
