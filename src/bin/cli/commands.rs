use std::io::Write;

use stomp_engine::Engine;

use super::state::SharedState;

/// Result of executing a command
pub enum CommandResult {
    Ok,
    /// Command requests exit
    Quit,
    Error(String),
}

/// Parse and execute a command
pub async fn execute_command(line: &str, engine: &Engine, state: SharedState) -> CommandResult {
    let parts: Vec<&str> = line.trim().splitn(3, ' ').collect();
    if parts.is_empty() || parts[0].is_empty() {
        return CommandResult::Ok;
    }

    match parts[0] {
        "quit" | "exit" | "q" => CommandResult::Quit,

        "send" => {
            if parts.len() < 3 {
                return CommandResult::Error("Usage: send <destination> <message>".to_string());
            }
            if !engine.send(parts[1], parts[2].as_bytes().to_vec()) {
                return CommandResult::Error("Send failed: not connected".to_string());
            }
            state.lock().await.record_sent();
            CommandResult::Ok
        }

        "sub" | "subscribe" => {
            if parts.len() < 2 {
                return CommandResult::Error("Usage: sub <destination>".to_string());
            }
            let dest = parts[1];
            if !engine.subscribe(dest) {
                return CommandResult::Error(format!("Failed to subscribe to '{}'", dest));
            }
            state.lock().await.register_subscription(dest);
            println!("Subscribed to: {}", dest);
            CommandResult::Ok
        }

        "unsub" | "unsubscribe" => {
            if parts.len() < 2 {
                return CommandResult::Error("Usage: unsub <destination>".to_string());
            }
            let dest = parts[1];
            if !engine.unsubscribe(dest) {
                return CommandResult::Error(format!("Not subscribed to '{}'", dest));
            }
            state.lock().await.unregister_subscription(dest);
            println!("Unsubscribed from: {}", dest);
            CommandResult::Ok
        }

        "subs" => {
            let subs = engine.subscriptions();
            if subs.is_empty() {
                println!("No active subscriptions");
            }
            for sub in subs {
                println!("  {}  (id {})", sub.destination, sub.subscription_id);
            }
            CommandResult::Ok
        }

        "summary" => {
            let state = state.lock().await;
            if let Some(filename) = parts.get(1) {
                let written = std::fs::File::create(filename)
                    .and_then(|mut file| writeln!(file, "{}", state.generate_summary()));
                match written {
                    Ok(()) => println!("Summary written to {}", filename),
                    Err(e) => return CommandResult::Error(format!("Failed to write summary: {}", e)),
                }
            } else {
                println!("{}", state.generate_summary());
            }
            CommandResult::Ok
        }

        "help" | "?" => {
            print_help();
            CommandResult::Ok
        }

        _ => CommandResult::Error(format!("Unknown command: {}. Type 'help' for commands.", parts[0])),
    }
}

pub fn print_help() {
    println!("Commands:");
    println!("  send <destination> <message>  - Send a message");
    println!("  sub <destination>             - Subscribe to a destination");
    println!("  unsub <destination>           - Unsubscribe from a destination");
    println!("  subs                          - List active subscriptions");
    println!("  summary [file]                - Print session summary (or save to file)");
    println!("  quit                          - Disconnect and exit");
}
