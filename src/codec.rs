use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};

use crate::frame::{Command, Frame};
use crate::headers::{CONTENT_LENGTH, Headers};
use crate::parser::{parse_frame_slice, unescape_header_value};

/// Escape a STOMP header name or value for wire transmission.
///
/// Per STOMP 1.2 the following characters must be escaped:
/// - backslash (0x5c) → `\\`
/// - line feed (0x0a) → `\n`
/// - carriage return (0x0d) → `\r`
/// - colon (0x3a) → `\c`
///
/// Working char by char means an inserted `\` is never escaped twice.
pub fn escape_header_value(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            ':' => result.push_str("\\c"),
            _ => result.push(ch),
        }
    }
    result
}

/// Encode `frame` into its wire representation.
///
/// Byte order: command line, escaped headers in insertion order, blank line,
/// body, NUL. A `content-length` header is appended after the user headers
/// when the body is non-empty, unless the frame already carries one, in
/// which case that value is written untouched. Heartbeats encode to a bare
/// LF.
pub fn encode(frame: &Frame) -> Bytes {
    let mut dst = BytesMut::new();
    encode_into(frame, &mut dst);
    dst.freeze()
}

/// [`encode`] appending into an existing buffer.
pub fn encode_into(frame: &Frame, dst: &mut BytesMut) {
    if frame.command == Command::Heartbeat {
        dst.put_u8(b'\n');
        return;
    }

    let body: &[u8] = if frame.command.body_allowed() {
        &frame.body
    } else {
        if !frame.body.is_empty() {
            warn!(command = %frame.command, "dropping body on frame that does not allow one");
        }
        &[]
    };

    dst.extend_from_slice(frame.command.as_str().as_bytes());
    dst.put_u8(b'\n');

    for (k, v) in frame.headers.iter() {
        dst.extend_from_slice(escape_header_value(k).as_bytes());
        dst.put_u8(b':');
        dst.extend_from_slice(escape_header_value(v).as_bytes());
        dst.put_u8(b'\n');
    }
    if !body.is_empty() && !frame.headers.contains(CONTENT_LENGTH) {
        dst.extend_from_slice(CONTENT_LENGTH.as_bytes());
        dst.put_u8(b':');
        dst.extend_from_slice(body.len().to_string().as_bytes());
        dst.put_u8(b'\n');
    }

    dst.put_u8(b'\n');
    dst.extend_from_slice(body);
    dst.put_u8(0);
}

/// True for input made only of EOL bytes (plus NUL padding), with at least
/// one LF.
fn is_heartbeat(input: &[u8]) -> bool {
    input.contains(&b'\n') && input.iter().all(|b| matches!(b, b'\n' | b'\r' | 0))
}

/// Decode one frame from `input`.
///
/// Returns `None` (never an error) when the bytes do not form a complete,
/// well-formed frame with a known command; callers treat that as "nothing to
/// deliver". A lone LF decodes to a [`Command::Heartbeat`] frame. Bytes after
/// the terminating NUL, such as transport padding, are ignored.
pub fn decode(input: &[u8]) -> Option<Frame> {
    if is_heartbeat(input) {
        return Some(Frame::heartbeat());
    }

    let raw = match parse_frame_slice(input) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(len = input.len(), "incomplete frame");
            return None;
        }
        Err(e) => {
            warn!(error = %e, "malformed frame");
            return None;
        }
    };

    let command = match std::str::from_utf8(&raw.command)
        .ok()
        .and_then(|c| c.parse::<Command>().ok())
    {
        Some(command) => command,
        None => {
            debug!(command = %String::from_utf8_lossy(&raw.command), "unknown command");
            return None;
        }
    };

    let mut headers = Headers::new();
    for (k, v) in &raw.headers {
        let key = unescape_utf8(k)?;
        let value = unescape_utf8(v)?;
        headers.append(key, value);
    }

    let mut body = raw.body;
    if !body.is_empty() && !command.body_allowed() {
        warn!(command = %command, len = body.len(), "discarding body on frame that does not allow one");
        body.clear();
    }

    trace!(command = %command, headers = headers.len(), body = body.len(), "decoded frame");
    Some(Frame {
        command,
        headers,
        body,
    })
}

fn unescape_utf8(escaped: &[u8]) -> Option<String> {
    match unescape_header_value(escaped) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(error = %e, "header is not valid utf8");
                None
            }
        },
        Err(e) => {
            warn!(error = %e, "bad header escape");
            None
        }
    }
}

/// `StompStreamCodec` splits a continuous byte stream (e.g. TCP) into whole
/// STOMP wire frames for `tokio_util::codec::Framed`.
///
/// Each decoded item is the exact byte span of one frame, ready for
/// [`decode`]; a heartbeat LF is yielded on its own. Frames using
/// `content-length` may contain NUL bytes in the body. Encoding writes
/// already-encoded frames through unchanged.
#[derive(Debug, Default)]
pub struct StompStreamCodec {}

impl StompStreamCodec {
    pub fn new() -> Self {
        Self {}
    }
}

impl Decoder for StompStreamCodec {
    type Item = Bytes;
    type Error = io::Error;

    /// Returns `Ok(None)` and leaves `src` untouched until a complete frame is
    /// buffered; protocol errors surface as `InvalidData`.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match src.chunk().first() {
            Some(b'\n') => return Ok(Some(src.split_to(1).freeze())),
            Some(b'\r') if src.chunk().get(1) == Some(&b'\n') => {
                src.advance(1);
                return Ok(Some(src.split_to(1).freeze()));
            }
            _ => {}
        }

        match parse_frame_slice(src.chunk()) {
            Ok(Some(raw)) => Ok(Some(src.split_to(raw.consumed).freeze())),
            Ok(None) => Ok(None),
            Err(e) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("parse error: {}", e),
            )),
        }
    }
}

impl Encoder<Bytes> for StompStreamCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}
