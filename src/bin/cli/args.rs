use clap::Parser;

use stomp_engine::ClientConfig;
use stomp_engine::headers::parse_heartbeat_header;

#[derive(Parser)]
#[command(name = "stomp")]
#[command(version)]
#[command(about = "Interactive STOMP client over WebSocket or TCP")]
pub struct Cli {
    /// Broker address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:15674")]
    pub address: String,

    /// WebSocket path appended to the address
    #[arg(long, default_value = "/ws")]
    pub path: String,

    /// Full endpoint URL; overrides --address and --path
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Speak raw STOMP over TCP instead of WebSocket
    #[arg(long)]
    pub tcp: bool,

    /// Login username
    #[arg(short, long, default_value = "guest")]
    pub login: String,

    /// Passcode
    #[arg(short, long, default_value = "guest")]
    pub passcode: String,

    /// Virtual host sent in the `host` header
    #[arg(long)]
    pub vhost: Option<String>,

    /// Heartbeat settings (client-send,client-receive in ms)
    #[arg(long, default_value = "10000,10000")]
    pub heartbeat: String,

    /// Destinations to subscribe to (can be specified multiple times)
    #[arg(short, long)]
    pub subscribe: Vec<String>,

    /// Show session summary on exit
    #[arg(long)]
    pub summary: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// URL the transport connects to.
    pub fn endpoint_url(&self) -> String {
        match (&self.endpoint, self.tcp) {
            (Some(url), _) => url.clone(),
            (None, true) => format!("tcp://{}", self.address),
            (None, false) => format!("ws://{}{}", self.address, self.path),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        let (host, port) = split_address(&self.address);
        let (send, receive) = parse_heartbeat_header(&self.heartbeat);
        let mut config = ClientConfig::new(host, port)
            .endpoint(self.endpoint_url())
            .credentials(self.login.as_str(), self.passcode.as_str())
            .heartbeat(send, receive);
        config.virtual_host = Some(self.vhost.clone().unwrap_or_else(|| host.to_string()));
        config
    }
}

fn split_address(address: &str) -> (&str, u16) {
    match address.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().unwrap_or(0)),
        None => (address, 0),
    }
}
