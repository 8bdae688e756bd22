//! Ordered header multimap and the typed accessor the engine builds frames
//! with.

pub const DESTINATION: &str = "destination";
pub const SUBSCRIPTION_ID: &str = "id";
pub const HOST: &str = "host";
pub const ACCEPT_VERSION: &str = "accept-version";
pub const LOGIN: &str = "login";
pub const PASSCODE: &str = "passcode";
pub const HEART_BEAT: &str = "heart-beat";
pub const CONTENT_LENGTH: &str = "content-length";
pub const MESSAGE: &str = "message";
pub const RECEIPT: &str = "receipt";

/// Header multimap preserving insertion order.
///
/// Duplicate names are stored as-is and written to the wire in order; every
/// lookup returns the first value stored under a name, which matches the
/// STOMP rule that the first occurrence of a repeated header wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, keeping any existing value with the same name.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Replace the first value stored under `key`, or append when absent.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Remove every value stored under `key`, returning the first one.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let first = self
            .entries
            .iter()
            .position(|(k, _)| k == key)
            .map(|pos| self.entries.remove(pos).1);
        self.entries.retain(|(k, _)| k != key);
        first
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn destination(&self) -> Option<&str> {
        self.get(DESTINATION)
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.get(SUBSCRIPTION_ID)
    }

    pub fn host(&self) -> Option<&str> {
        self.get(HOST)
    }

    pub fn accept_version(&self) -> Option<&str> {
        self.get(ACCEPT_VERSION)
    }

    pub fn login(&self) -> Option<&str> {
        self.get(LOGIN)
    }

    pub fn passcode(&self) -> Option<&str> {
        self.get(PASSCODE)
    }

    /// The `heart-beat` pair; `(0, 0)` when the header is absent.
    pub fn heart_beat(&self) -> (u64, u64) {
        self.get(HEART_BEAT)
            .map(parse_heartbeat_header)
            .unwrap_or((0, 0))
    }

    /// The `content-length` value, if present and numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.get(CONTENT_LENGTH)
            .and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn message(&self) -> Option<&str> {
        self.get(MESSAGE)
    }

    pub fn receipt(&self) -> Option<&str> {
        self.get(RECEIPT)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.append(k, v);
        }
        headers
    }
}

/// Builder over [`Headers`] with one setter per header the engine uses.
///
/// Setters taking `Option` skip the header when given `None`, so optional
/// configuration can be passed straight through.
#[derive(Debug, Clone, Default)]
pub struct HeaderAccessor {
    headers: Headers,
}

impl HeaderAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from raw pairs, e.g. user-supplied headers.
    pub fn of<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            headers: pairs.into_iter().collect(),
        }
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.headers.set(DESTINATION, destination);
        self
    }

    pub fn subscription_id(mut self, id: impl Into<String>) -> Self {
        self.headers.set(SUBSCRIPTION_ID, id);
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.headers.set(HOST, host);
        self
    }

    pub fn accept_version(mut self, version: impl Into<String>) -> Self {
        self.headers.set(ACCEPT_VERSION, version);
        self
    }

    pub fn login(mut self, login: Option<impl Into<String>>) -> Self {
        if let Some(login) = login {
            self.headers.set(LOGIN, login);
        }
        self
    }

    pub fn passcode(mut self, passcode: Option<impl Into<String>>) -> Self {
        if let Some(passcode) = passcode {
            self.headers.set(PASSCODE, passcode);
        }
        self
    }

    /// Sets `heart-beat` to `"<send>,<receive>"`.
    pub fn heart_beat(mut self, send: u64, receive: u64) -> Self {
        self.headers.set(HEART_BEAT, format!("{},{}", send, receive));
        self
    }

    /// An explicit length is written verbatim by the encoder instead of the
    /// computed one.
    pub fn content_length(mut self, length: usize) -> Self {
        self.headers.set(CONTENT_LENGTH, length.to_string());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.headers.set(MESSAGE, message);
        self
    }

    pub fn receipt(mut self, receipt: impl Into<String>) -> Self {
        self.headers.set(RECEIPT, receipt);
        self
    }

    pub fn build(self) -> Headers {
        self.headers
    }
}

/// Parse the STOMP `heart-beat` header value (format: "cx,cy").
///
/// Parameters
/// - `header`: header string from the server or client (for example
///   "10000,10000"). The values represent milliseconds.
///
/// Returns a tuple `(cx, cy)` where each value is the heartbeat interval in
/// milliseconds. Missing or invalid fields default to `0`.
pub fn parse_heartbeat_header(header: &str) -> (u64, u64) {
    let mut parts = header.split(',');
    let cx = parts
        .next()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let cy = parts
        .next()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    (cx, cy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_write_wins_on_lookup() {
        let mut h = Headers::new();
        h.append("destination", "/a");
        h.append("destination", "/b");
        assert_eq!(h.destination(), Some("/a"));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn remove_drops_every_duplicate() {
        let mut h: Headers = [("x", "1"), ("y", "2"), ("x", "3")].into_iter().collect();
        assert_eq!(h.remove("x"), Some("1".to_string()));
        assert!(!h.contains("x"));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn accessor_skips_absent_credentials() {
        let h = HeaderAccessor::new()
            .host("ws://localhost:8080")
            .login(None::<String>)
            .passcode(Some("secret"))
            .build();
        assert!(h.login().is_none());
        assert_eq!(h.passcode(), Some("secret"));
    }

    #[test]
    fn heart_beat_round_trips_through_text() {
        let h = HeaderAccessor::new().heart_beat(5000, 10000).build();
        assert_eq!(h.get(HEART_BEAT), Some("5000,10000"));
        assert_eq!(h.heart_beat(), (5000, 10000));
        assert_eq!(Headers::new().heart_beat(), (0, 0));
    }
}
