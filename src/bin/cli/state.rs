use chrono::{DateTime, Local};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Maximum number of messages kept for the session report
pub const MAX_MESSAGES: usize = 1000;

/// Statistics for a single subscription destination
#[derive(Debug, Clone, Default)]
pub struct SubStats {
    pub message_count: u64,
}

/// A message received during the session
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub timestamp: DateTime<Local>,
    pub destination: String,
    pub body: String,
}

/// Session bookkeeping shared between the command loop and the event printer
pub struct SessionState {
    pub start_time: DateTime<Local>,
    pub endpoint: String,
    pub user: String,

    /// Destination -> stats, including destinations no longer subscribed
    pub subscriptions: HashMap<String, SubStats>,
    pub sent_count: u64,
    pub error_count: u64,
    pub messages: VecDeque<ReceivedMessage>,
}

impl SessionState {
    pub fn new(endpoint: String, user: String) -> Self {
        Self {
            start_time: Local::now(),
            endpoint,
            user,
            subscriptions: HashMap::new(),
            sent_count: 0,
            error_count: 0,
            messages: VecDeque::with_capacity(MAX_MESSAGES),
        }
    }

    pub fn register_subscription(&mut self, destination: &str) {
        self.subscriptions.entry(destination.to_string()).or_default();
    }

    pub fn unregister_subscription(&mut self, destination: &str) {
        self.subscriptions.remove(destination);
    }

    pub fn record_message(&mut self, destination: &str, body: String) {
        let stats = self.subscriptions.entry(destination.to_string()).or_default();
        stats.message_count += 1;

        self.messages.push_back(ReceivedMessage {
            timestamp: Local::now(),
            destination: destination.to_string(),
            body,
        });
        while self.messages.len() > MAX_MESSAGES {
            self.messages.pop_front();
        }
    }

    pub fn record_sent(&mut self) {
        self.sent_count += 1;
    }

    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    pub fn total_message_count(&self) -> u64 {
        self.subscriptions.values().map(|s| s.message_count).sum()
    }

    /// Generate session summary text
    pub fn generate_summary(&self) -> String {
        let end_time = Local::now();
        let total_secs = end_time.signed_duration_since(self.start_time).num_seconds();
        let mins = total_secs / 60;
        let secs = total_secs % 60;

        let rule = "═".repeat(79);
        let mut lines = vec![
            rule.clone(),
            "  STOMP Session Report".to_string(),
            rule.clone(),
            format!("  Endpoint:   {}", self.endpoint),
            format!("  User:       {}", self.user),
            format!("  Started:    {}", self.start_time.format("%Y-%m-%d %H:%M:%S")),
            format!("  Ended:      {}", end_time.format("%Y-%m-%d %H:%M:%S")),
            format!("  Duration:   {}m {}s", mins, secs),
            String::new(),
            "  Subscriptions:".to_string(),
        ];

        // Busiest destination first
        let mut subs: Vec<_> = self.subscriptions.iter().collect();
        subs.sort_by(|a, b| b.1.message_count.cmp(&a.1.message_count).then(a.0.cmp(b.0)));

        let width = subs.iter().map(|(d, _)| d.len()).max().unwrap_or(20).min(40);
        for (dest, stats) in &subs {
            lines.push(format!(
                "    {:width$} {:>6}",
                truncate_str(dest, width),
                stats.message_count,
                width = width
            ));
        }
        lines.push(format!("    {:─>width$}", "", width = width + 7));
        lines.push(format!("    {:width$} {:>6}", "Total", self.total_message_count(), width = width));
        lines.push(String::new());
        lines.push(format!("  Messages sent:   {}", self.sent_count));
        lines.push(format!("  Broker errors:   {}", self.error_count));
        lines.push(rule);

        lines.join("\n")
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// Thread-safe shared state
pub type SharedState = Arc<Mutex<SessionState>>;

pub fn new_shared_state(endpoint: String, user: String) -> SharedState {
    Arc::new(Mutex::new(SessionState::new(endpoint, user)))
}
