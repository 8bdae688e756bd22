use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use stomp_engine::{Engine, Event, EventStream, Frame, TcpTransport, Transport, WebSocketTransport};
use tokio::sync::mpsc;

use super::args::Cli;
use super::commands::{CommandResult, execute_command, print_help};
use super::exit_codes;
use super::state::{SharedState, new_shared_state};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the CLI in plain line mode
pub async fn run(cli: &Cli) -> Result<(), (String, u8)> {
    let config = cli.client_config();
    let endpoint = config.url();
    println!("Connecting to {}...", endpoint);

    let transport: Arc<dyn Transport> = if cli.tcp || endpoint.starts_with("tcp://") {
        Arc::new(TcpTransport::new())
    } else {
        Arc::new(WebSocketTransport::new())
    };
    let engine = Engine::new(config, transport);

    let mut events = engine.events();
    engine.connect();
    wait_connected(&mut events, &endpoint).await?;
    println!("Connected.");

    let state = new_shared_state(endpoint, cli.login.clone());

    for dest in &cli.subscribe {
        if !engine.subscribe(dest) {
            return Err((
                format!("Failed to subscribe to '{}'", dest),
                exit_codes::PROTOCOL_ERROR,
            ));
        }
        state.lock().await.register_subscription(dest);
        println!("Subscribed to: {}", dest);
    }

    // Closed when the connection goes away
    let (closed_tx, mut closed_rx) = mpsc::channel::<()>(1);
    tokio::spawn(print_events(events, state.clone(), closed_tx));

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<String>(16);

    // Blocking stdin reader
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) => {
                    if cmd_tx.blocking_send(l).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    println!();
    print_help();
    println!();

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let line = tokio::select! {
            line = cmd_rx.recv() => match line {
                Some(l) => l,
                None => break,
            },
            _ = closed_rx.recv() => {
                return Err(("Connection lost".to_string(), exit_codes::NETWORK_ERROR));
            }
        };

        match execute_command(&line, &engine, state.clone()).await {
            CommandResult::Ok => {}
            CommandResult::Quit => break,
            CommandResult::Error(msg) => eprintln!("{}", msg),
        }
    }

    println!("Disconnecting...");
    if cli.summary {
        println!("{}", state.lock().await.generate_summary());
    }
    if engine.disconnect() {
        // Let the transport finish the closing handshake
        let _ = tokio::time::timeout(Duration::from_secs(2), closed_rx.recv()).await;
    }
    Ok(())
}

/// Wait for the broker's answer to CONNECT.
async fn wait_connected(events: &mut EventStream, endpoint: &str) -> Result<(), (String, u8)> {
    let outcome = tokio::time::timeout(CONNECT_TIMEOUT, async {
        loop {
            match events.recv().await {
                Some(Event::Connected) => return Ok(()),
                Some(Event::Error(frame)) => {
                    return Err((
                        format!("Broker rejected connection: {}", describe_error(&frame)),
                        exit_codes::PROTOCOL_ERROR,
                    ));
                }
                Some(Event::Disconnected) | None => {
                    return Err((
                        format!("Connection failed: {}", endpoint),
                        exit_codes::NETWORK_ERROR,
                    ));
                }
                Some(_) => {}
            }
        }
    })
    .await;

    match outcome {
        Ok(result) => result,
        Err(_) => Err((
            format!("Connection timed out: {}", endpoint),
            exit_codes::NETWORK_ERROR,
        )),
    }
}

async fn print_events(mut events: EventStream, state: SharedState, closed: mpsc::Sender<()>) {
    while let Some(event) = events.recv().await {
        match event {
            Event::Message(message) => {
                println!("\n[{}] MESSAGE received:", message.destination);
                if !message.raw_payload.is_empty() {
                    println!("  Body: {}", message.raw_payload);
                }
                state
                    .lock()
                    .await
                    .record_message(&message.destination, message.raw_payload);
            }
            Event::Error(frame) => {
                eprintln!("\n[BROKER ERROR] {}", describe_error(&frame));
                for (k, v) in frame.headers.iter() {
                    eprintln!("  {}: {}", k, v);
                }
                state.lock().await.record_error();
            }
            Event::SubscriptionAlreadyExists => {
                eprintln!("\nAlready subscribed to that destination");
            }
            Event::Disconnected => {
                println!("\nConnection closed.");
                let _ = closed.send(()).await;
                break;
            }
            Event::Connected => {}
        }
        print!("> ");
        let _ = io::stdout().flush();
    }
}

fn describe_error(frame: &Frame) -> String {
    let message = frame.headers.message().unwrap_or("ERROR");
    if frame.body.is_empty() {
        message.to_string()
    } else {
        format!("{}: {}", message, String::from_utf8_lossy(&frame.body).trim_end())
    }
}
