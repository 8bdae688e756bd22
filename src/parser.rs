// Slice-based STOMP frame parser (produces owned Vecs from input slices)
use thiserror::Error;

/// Protocol errors found while parsing a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),
    #[error("invalid content-length '{0}'")]
    InvalidContentLength(String),
    #[error("missing NUL terminator after content-length body")]
    MissingTerminator,
    #[error("undefined escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("dangling backslash at end of header")]
    DanglingEscape,
}

/// One frame as it appeared on the wire: header names and values are still
/// escaped and the command is not yet interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub command: Vec<u8>,
    pub headers: Vec<(Vec<u8>, Vec<u8>)>,
    pub body: Vec<u8>,
    /// Bytes of input this frame occupied, including skipped leading EOLs,
    /// the NUL terminator and one optional trailing LF.
    pub consumed: usize,
}

fn get_content_length(headers: &[(Vec<u8>, Vec<u8>)]) -> Result<Option<usize>, ParseError> {
    for (k, v) in headers {
        if k.as_slice() == b"content-length" {
            let s = String::from_utf8_lossy(v);
            let trimmed = s.trim();
            return trimmed
                .parse::<usize>()
                .map(Some)
                .map_err(|_| ParseError::InvalidContentLength(trimmed.to_string()));
        }
    }
    Ok(None)
}

fn strip_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

/// Parse a single STOMP frame from a raw byte slice.
///
/// Returns `Ok(Some(RawFrame))` when a full frame was parsed, `Ok(None)` when
/// more bytes are required and `Err` on protocol errors. Leading EOLs
/// (heartbeats) are skipped; callers that care about heartbeats check for
/// them before calling.
pub fn parse_frame_slice(input: &[u8]) -> Result<Option<RawFrame>, ParseError> {
    let mut pos = 0usize;
    let len = input.len();

    while pos < len && (input[pos] == b'\n' || input[pos] == b'\r') {
        pos += 1;
    }

    // command line
    let Some(cmd_end_rel) = input[pos..].iter().position(|&b| b == b'\n') else {
        return Ok(None);
    };
    let command = strip_cr(&input[pos..pos + cmd_end_rel]).to_vec();
    pos += cmd_end_rel + 1;

    // headers until an empty line
    let mut headers: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
    loop {
        if pos >= len {
            return Ok(None);
        }
        if input[pos] == b'\n' {
            pos += 1;
            break;
        }
        if input[pos] == b'\r' && input.get(pos + 1) == Some(&b'\n') {
            pos += 2;
            break;
        }
        let Some(line_end_rel) = input[pos..].iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let line = strip_cr(&input[pos..pos + line_end_rel]);
        match line.iter().position(|&b| b == b':') {
            Some(colon) => headers.push((line[..colon].to_vec(), line[colon + 1..].to_vec())),
            None => {
                return Err(ParseError::MalformedHeader(
                    String::from_utf8_lossy(line).into_owned(),
                ));
            }
        }
        pos += line_end_rel + 1;
    }

    let body = match get_content_length(&headers)? {
        Some(content_len) => {
            // need content_len bytes plus the terminating NUL
            let Some(end) = pos.checked_add(content_len).and_then(|n| n.checked_add(1)) else {
                return Err(ParseError::InvalidContentLength(content_len.to_string()));
            };
            if end > len {
                return Ok(None);
            }
            let body = input[pos..pos + content_len].to_vec();
            pos += content_len;
            if input[pos] != 0 {
                return Err(ParseError::MissingTerminator);
            }
            pos += 1;
            body
        }
        None => {
            let Some(nul_rel) = input[pos..].iter().position(|&b| b == 0) else {
                return Ok(None);
            };
            let body = input[pos..pos + nul_rel].to_vec();
            pos += nul_rel + 1;
            body
        }
    };

    // optional trailing LF
    if pos < len && input[pos] == b'\n' {
        pos += 1;
    }

    Ok(Some(RawFrame {
        command,
        headers,
        body,
        consumed: pos,
    }))
}

/// Reverse STOMP header escaping in one left-to-right pass:
/// `\c` → `:`, `\r` → CR, `\n` → LF, `\\` → `\`.
pub fn unescape_header_value(input: &[u8]) -> Result<Vec<u8>, ParseError> {
    let mut out = Vec::with_capacity(input.len());
    let mut bytes = input.iter();
    while let Some(&b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match bytes.next() {
            Some(b'c') => out.push(b':'),
            Some(b'r') => out.push(b'\r'),
            Some(b'n') => out.push(b'\n'),
            Some(b'\\') => out.push(b'\\'),
            Some(&other) => return Err(ParseError::InvalidEscape(other as char)),
            None => return Err(ParseError::DanglingEscape),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_more_bytes_without_terminator() {
        assert_eq!(parse_frame_slice(b"MESSAGE\ndestination:/a\n\nbody"), Ok(None));
    }

    #[test]
    fn consumed_covers_skipped_eols_and_trailing_lf() {
        let raw = parse_frame_slice(b"\n\nSEND\n\nx\0\nrest").unwrap().unwrap();
        assert_eq!(raw.command, b"SEND");
        assert_eq!(raw.body, b"x");
        assert_eq!(raw.consumed, 11);
    }

    #[test]
    fn oversized_content_length_is_an_error() {
        let input = b"MESSAGE\ncontent-length:18446744073709551615\n\n\0";
        assert_eq!(
            parse_frame_slice(input),
            Err(ParseError::InvalidContentLength("18446744073709551615".into()))
        );
    }

    #[test]
    fn crlf_line_endings_accepted() {
        let raw = parse_frame_slice(b"MESSAGE\r\ndestination:/a\r\n\r\nhi\0")
            .unwrap()
            .unwrap();
        assert_eq!(raw.command, b"MESSAGE");
        assert_eq!(raw.headers, vec![(b"destination".to_vec(), b"/a".to_vec())]);
        assert_eq!(raw.body, b"hi");
    }

    #[test]
    fn unescape_is_single_pass() {
        // `\\c` is an escaped backslash followed by a literal `c`
        assert_eq!(unescape_header_value(b"a\\\\cb").unwrap(), b"a\\cb");
        assert_eq!(
            unescape_header_value(b"x\\ty"),
            Err(ParseError::InvalidEscape('t'))
        );
        assert_eq!(unescape_header_value(b"x\\"), Err(ParseError::DanglingEscape));
    }
}
