use bytes::BytesMut;
use stomp_engine::codec::{StompStreamCodec, decode};
use tokio_util::codec::Decoder;

// Feed bytes one at a time and assert the stream codec only yields once the
// whole frame, NUL included, is buffered.
#[test]
fn byte_by_byte_content_length() {
    let mut codec = StompStreamCodec::new();
    let raw = b"SEND\ncontent-length:5\n\nhello\0";

    let mut buf = BytesMut::new();
    for i in 0..raw.len() {
        buf.extend_from_slice(&raw[i..i + 1]);
        let res = codec.decode(&mut buf).expect("decode failed");
        if i < raw.len() - 1 {
            assert!(res.is_none(), "decoder produced item too early at byte {}", i);
        } else {
            let item = res.expect("expected item after final byte");
            assert_eq!(decode(&item).unwrap().body, b"hello");
        }
    }
}

#[test]
fn small_chunk_null_terminated() {
    let mut codec = StompStreamCodec::new();
    let raw = b"SEND\n\nchunked body\0";
    let mut buf = BytesMut::new();

    let mut offset = 0usize;
    while offset < raw.len() {
        let end = (offset + 3).min(raw.len());
        buf.extend_from_slice(&raw[offset..end]);
        let res = codec.decode(&mut buf).expect("decode failed");
        if end < raw.len() {
            assert!(res.is_none(), "decoder produced item too early at offset {}", end);
        } else {
            let item = res.expect("expected item after final chunk");
            assert_eq!(decode(&item).unwrap().body, b"chunked body");
        }
        offset = end;
    }
}

#[test]
fn malformed_stream_is_invalid_data() {
    let mut codec = StompStreamCodec::new();
    let mut buf = BytesMut::from(&b"MESSAGE\nno-colon-here\n\n\0"[..]);
    let err = codec.decode(&mut buf).expect_err("malformed header");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}
