//! Unit tests for the Frame model and command facts.

use stomp_engine::frame::UnknownCommand;
use stomp_engine::{Command, Frame, FrameError, HeaderAccessor};

// =============================================================================
// Command facts
// =============================================================================

#[test]
fn only_send_message_error_allow_body() {
    let all = [
        Command::Connect,
        Command::Disconnect,
        Command::Send,
        Command::Subscribe,
        Command::Unsubscribe,
        Command::Connected,
        Command::Message,
        Command::Error,
        Command::Heartbeat,
    ];
    let with_body: Vec<Command> = all.iter().copied().filter(|c| c.body_allowed()).collect();
    assert_eq!(with_body, vec![Command::Send, Command::Message, Command::Error]);

    let with_dest: Vec<Command> = all
        .iter()
        .copied()
        .filter(|c| c.destination_required())
        .collect();
    assert_eq!(with_dest, vec![Command::Send, Command::Subscribe]);
}

#[test]
fn command_parses_wire_names() {
    assert_eq!("CONNECTED".parse::<Command>(), Ok(Command::Connected));
    assert_eq!("MESSAGE".parse::<Command>(), Ok(Command::Message));
    assert_eq!(
        "BEGIN".parse::<Command>(),
        Err(UnknownCommand("BEGIN".to_string()))
    );
    // no command line for heartbeats
    assert!("HEARTBEAT".parse::<Command>().is_err());
}

// =============================================================================
// Builder
// =============================================================================

#[test]
fn frame_new_creates_empty() {
    let frame = Frame::new(Command::Send);
    assert_eq!(frame.command, Command::Send);
    assert!(frame.headers.is_empty());
    assert!(frame.body.is_empty());
}

#[test]
fn header_builder_preserves_order() {
    let frame = Frame::new(Command::Send)
        .header("z-header", "z")
        .header("a-header", "a")
        .header("m-header", "m");
    let names: Vec<&str> = frame.headers.iter().map(|(k, _)| k).collect();
    assert_eq!(names, vec!["z-header", "a-header", "m-header"]);
}

#[test]
fn get_header_returns_first_duplicate() {
    let frame = Frame::new(Command::Message)
        .header("destination", "/first")
        .header("destination", "/second");
    assert_eq!(frame.get_header("destination"), Some("/first"));
    assert_eq!(frame.headers.len(), 2);
}

#[test]
fn get_header_is_case_sensitive() {
    let frame = Frame::new(Command::Message).header("Destination", "/a");
    assert_eq!(frame.get_header("destination"), None);
}

#[test]
fn with_headers_replaces_everything() {
    let frame = Frame::new(Command::Subscribe)
        .header("stale", "x")
        .with_headers(
            HeaderAccessor::new()
                .subscription_id("sub-1")
                .destination("/topic/a")
                .build(),
        );
    assert_eq!(frame.get_header("stale"), None);
    assert_eq!(frame.headers.subscription_id(), Some("sub-1"));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn validate_rejects_body_on_connect() {
    let frame = Frame::new(Command::Connect).set_body(b"nope".to_vec());
    assert_eq!(frame.validate(), Err(FrameError::BodyNotAllowed(Command::Connect)));
}

#[test]
fn validate_requires_destination_for_send_and_subscribe() {
    assert_eq!(
        Frame::new(Command::Send).validate(),
        Err(FrameError::MissingDestination(Command::Send))
    );
    assert_eq!(
        Frame::new(Command::Subscribe).header("id", "1").validate(),
        Err(FrameError::MissingDestination(Command::Subscribe))
    );
    assert!(Frame::new(Command::Unsubscribe).header("id", "1").validate().is_ok());
}

#[test]
fn heartbeat_frame_is_empty_and_valid() {
    let hb = Frame::heartbeat();
    assert_eq!(hb.command, Command::Heartbeat);
    assert!(hb.headers.is_empty());
    assert!(hb.body.is_empty());
    assert!(hb.validate().is_ok());
}

// =============================================================================
// Display
// =============================================================================

#[test]
fn display_lists_command_headers_and_body_size() {
    let frame = Frame::new(Command::Error)
        .header("message", "bad")
        .set_body(b"details".to_vec());
    let s = frame.to_string();
    assert!(s.contains("Command: ERROR"));
    assert!(s.contains("message: bad"));
    assert!(s.contains("Body (7 bytes)"));
}
