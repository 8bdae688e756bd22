//! Unit tests for heartbeat parsing and negotiation functions.

use std::time::Duration;
use stomp_engine::heartbeat::READ_TIMEOUT_MULTIPLIER;
use stomp_engine::{negotiate_heartbeats, parse_heartbeat_header};

// =============================================================================
// parse_heartbeat_header tests
// =============================================================================

#[test]
fn parse_standard_heartbeat() {
    assert_eq!(parse_heartbeat_header("10000,10000"), (10000, 10000));
}

#[test]
fn parse_asymmetric_heartbeat() {
    assert_eq!(parse_heartbeat_header("5000,15000"), (5000, 15000));
}

#[test]
fn parse_whitespace_padded() {
    assert_eq!(parse_heartbeat_header(" 10000 , 10000 "), (10000, 10000));
    assert_eq!(parse_heartbeat_header("\t5000\t,\t5000\t"), (5000, 5000));
}

#[test]
fn parse_missing_or_empty_fields_default_to_zero() {
    assert_eq!(parse_heartbeat_header("10000"), (10000, 0));
    assert_eq!(parse_heartbeat_header("10000,"), (10000, 0));
    assert_eq!(parse_heartbeat_header(",10000"), (0, 10000));
    assert_eq!(parse_heartbeat_header(""), (0, 0));
}

#[test]
fn parse_invalid_values_default_to_zero() {
    assert_eq!(parse_heartbeat_header("abc,10000"), (0, 10000));
    assert_eq!(parse_heartbeat_header("10000,xyz"), (10000, 0));
    // negative values can't parse as u64
    assert_eq!(parse_heartbeat_header("-1,10000"), (0, 10000));
}

#[test]
fn parse_extra_commas_ignored() {
    assert_eq!(parse_heartbeat_header("10000,10000,5000,extra"), (10000, 10000));
}

// =============================================================================
// negotiate_heartbeats tests
// =============================================================================

#[test]
fn negotiate_both_zero_disables() {
    assert_eq!(negotiate_heartbeats(0, 0, 0, 0), (None, None));
}

#[test]
fn negotiate_takes_max_and_stretches_read_side() {
    // client (5000, 5000), broker advertises 10000,10000
    let (write, read) = negotiate_heartbeats(5000, 5000, 10000, 10000);
    assert_eq!(write, Some(Duration::from_millis(10000)));
    assert_eq!(read, Some(Duration::from_millis(30000)));
}

#[test]
fn negotiate_asymmetric() {
    // write = max(5000, 20000); read = max(15000, 3000) * 3
    let (write, read) = negotiate_heartbeats(5000, 15000, 3000, 20000);
    assert_eq!(write, Some(Duration::from_millis(20000)));
    assert_eq!(read, Some(Duration::from_millis(45000)));
}

#[test]
fn negotiate_requires_both_sides_for_each_direction() {
    // broker does not take part
    assert_eq!(negotiate_heartbeats(10000, 10000, 0, 0), (None, None));
    // client does not take part
    assert_eq!(negotiate_heartbeats(0, 0, 10000, 10000), (None, None));
}

#[test]
fn negotiate_one_direction_only() {
    let (write, read) = negotiate_heartbeats(10000, 0, 0, 10000);
    assert_eq!(write, Some(Duration::from_millis(10000)));
    assert!(read.is_none());

    let (write, read) = negotiate_heartbeats(0, 10000, 10000, 0);
    assert!(write.is_none());
    assert_eq!(read, Some(Duration::from_millis(30000)));
}

#[test]
fn negotiate_one_millisecond() {
    let (write, read) = negotiate_heartbeats(1, 1, 1, 1);
    assert_eq!(write, Some(Duration::from_millis(1)));
    assert_eq!(read, Some(Duration::from_millis(u64::from(READ_TIMEOUT_MULTIPLIER))));
}
