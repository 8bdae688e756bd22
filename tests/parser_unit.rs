use stomp_engine::codec::decode;
use stomp_engine::parser::{ParseError, parse_frame_slice};

#[test]
fn parse_frame_slice_invalid_content_length() {
    let raw = b"SEND\ncontent-length:xyz\n\nhello\0".to_vec();
    match parse_frame_slice(&raw) {
        Err(ParseError::InvalidContentLength(v)) => assert_eq!(v, "xyz"),
        Err(e) => panic!("unexpected error {:?}", e),
        Ok(Some(_)) => panic!("expected error for invalid content-length"),
        Ok(None) => panic!("expected error, got None (need more bytes)"),
    }
}

#[test]
fn header_line_without_colon_is_malformed() {
    let raw = b"MESSAGE\nnocolon\n\n\0";
    assert!(matches!(
        parse_frame_slice(raw),
        Err(ParseError::MalformedHeader(_))
    ));
    assert_eq!(decode(raw), None);
}

#[test]
fn missing_nul_needs_more_bytes() {
    assert_eq!(parse_frame_slice(b"MESSAGE\ndestination:/a\n\nbody"), Ok(None));
    assert_eq!(decode(b"MESSAGE\ndestination:/a\n\nbody"), None);
}

#[test]
fn crlf_line_endings_are_accepted() {
    let raw = parse_frame_slice(b"MESSAGE\r\ndestination:/a\r\n\r\nhi\0")
        .unwrap()
        .unwrap();
    assert_eq!(raw.command, b"MESSAGE");
    assert_eq!(raw.headers, vec![(b"destination".to_vec(), b"/a".to_vec())]);
    assert_eq!(raw.body, b"hi");
}

#[test]
fn consumed_counts_leading_eols_and_trailing_lf() {
    let input = b"\n\nSEND\n\nx\0\nNEXT";
    let raw = parse_frame_slice(input).unwrap().unwrap();
    assert_eq!(raw.consumed, input.len() - 4);
}

#[test]
fn unknown_command_decodes_to_none() {
    assert_eq!(decode(b"BEGIN\ntransaction:tx1\n\n\0"), None);
    assert_eq!(decode(b"garbage without newline"), None);
}
