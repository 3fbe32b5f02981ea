//! Incremental response assembly for the client side.
//!
//! [`ResponseDecoder`] mirrors [`RequestDecoder`](crate::codec::RequestDecoder):
//! the same targets, limits and chunk framing, but it reads a status line and
//! keeps chunk boundaries, since encrypted chunks are decrypted one by one.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::framing::{
    CRLF, Cursor, HEAD_TERMINATOR, MAX_CHUNK_LINE_BYTES, Target, chunk_data_target, chunk_payload, parse_chunk_size,
};
use crate::codec::{DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_HEADER_BYTES};
use crate::ensure;
use crate::protocol::{Headers, ParseError, ResponseHead, StatusLine};

/// A response as framed on the wire.
///
/// A `Content-Length` body lands in `body`; a chunked one in `chunks`, one
/// entry per non-empty chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedResponse {
    pub head: ResponseHead,
    pub body: Bytes,
    pub chunks: Vec<Bytes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Head,
    BodyByLength,
    ChunkSize,
    ChunkData,
    Complete,
}

#[derive(Debug)]
pub struct ResponseDecoder {
    max_header_bytes: usize,
    max_body_bytes: usize,
    head_only: bool,
    state: State,
    cursor: Cursor,
    head: Option<ResponseHead>,
    body: Bytes,
    chunks: Vec<Bytes>,
    received: usize,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_limits(max_header_bytes: usize, max_body_bytes: usize) -> Self {
        Self { max_header_bytes, max_body_bytes, ..Default::default() }
    }

    /// Whether the next response answers a `HEAD` request and so carries no
    /// body whatever its headers announce.
    pub fn set_head_only(&mut self, head_only: bool) {
        self.head_only = head_only;
    }

    fn acquire(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, ParseError> {
        let max_marker_len = match self.state {
            State::Head => self.max_header_bytes,
            _ => MAX_CHUNK_LINE_BYTES,
        };
        self.cursor.acquire(src, max_marker_len).map_err(|len| match self.state {
            State::Head => ParseError::too_large_header(len, self.max_header_bytes),
            _ => ParseError::invalid_body("chunk size line too long"),
        })
    }

    fn advance(&mut self, frame: BytesMut) -> Result<(), ParseError> {
        match self.state {
            State::Head => {
                let head = parse_head(&frame)?;
                self.begin_body(&head)?;
                self.head = Some(head);
            }
            State::BodyByLength => {
                self.body = frame.freeze();
                self.state = State::Complete;
            }
            State::ChunkSize => {
                let size = parse_chunk_size(&frame)?;
                self.cursor.set(chunk_data_target(self.received, size, self.max_body_bytes)?);
                self.state = State::ChunkData;
            }
            State::ChunkData => {
                let payload = chunk_payload(&frame)?;
                if payload.is_empty() {
                    self.state = State::Complete;
                } else {
                    self.received += payload.len();
                    self.chunks.push(Bytes::copy_from_slice(payload));
                    self.cursor.set(Target::Marker(CRLF));
                    self.state = State::ChunkSize;
                }
            }
            State::Complete => {}
        }
        Ok(())
    }

    fn begin_body(&mut self, head: &ResponseHead) -> Result<(), ParseError> {
        if self.head_only {
            self.cursor.set(Target::Length(0));
            self.state = State::BodyByLength;
        } else if let Some(value) = head.headers.get("Content-Length") {
            let len = value.trim().parse::<usize>().map_err(ParseError::invalid_content_length)?;
            ensure!(len <= self.max_body_bytes, ParseError::too_large_body(len, self.max_body_bytes));
            self.cursor.set(Target::Length(len));
            self.state = State::BodyByLength;
        } else if head.headers.contains("Transfer-Encoding") {
            self.cursor.set(Target::Marker(CRLF));
            self.state = State::ChunkSize;
        } else {
            self.cursor.set(Target::Length(0));
            self.state = State::BodyByLength;
        }
        trace!(state = ?self.state, target = ?self.cursor.target(), "response head parsed");
        Ok(())
    }

    fn emit(&mut self) -> Result<ReceivedResponse, ParseError> {
        let head = self.head.take().ok_or_else(|| ParseError::invalid_body("body without a response head"))?;
        let response = ReceivedResponse {
            head,
            body: std::mem::take(&mut self.body),
            chunks: std::mem::take(&mut self.chunks),
        };
        self.received = 0;
        self.state = State::Head;
        self.cursor.set(Target::Marker(HEAD_TERMINATOR));
        Ok(response)
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self {
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            head_only: false,
            state: State::Head,
            cursor: Cursor::new(Target::Marker(HEAD_TERMINATOR)),
            head: None,
            body: Bytes::new(),
            chunks: Vec::new(),
            received: 0,
        }
    }
}

impl Decoder for ResponseDecoder {
    type Item = ReceivedResponse;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == State::Complete {
                return self.emit().map(Some);
            }

            match self.acquire(src)? {
                Some(frame) => self.advance(frame)?,
                None => return Ok(None),
            }
        }
    }
}

fn parse_head(bytes: &[u8]) -> Result<ResponseHead, ParseError> {
    let head = bytes.strip_suffix(HEAD_TERMINATOR).unwrap_or(bytes);
    let head = std::str::from_utf8(head).map_err(ParseError::invalid_header)?;
    let (line, block) = head.split_once("\r\n").unwrap_or((head, ""));
    Ok(ResponseHead { line: StatusLine::parse(line)?, headers: Headers::parse(block)? })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use indoc::indoc;

    fn crlf(text: &str) -> String {
        text.replace('\n', "\r\n")
    }

    #[test]
    fn length_delimited_then_chunked() {
        let raw = crlf(indoc! {"
            HTTP/1.1 404 Not Found
            Content-Length: 13

            404 Not FoundHTTP/1.1 200 OK
            Transfer-Encoding: chunked

            5
            hello
            5;ext=1
            world
            0

        "});

        let mut decoder = ResponseDecoder::new();
        let mut buf = BytesMut::from(raw.as_str());

        let first = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.head.status(), StatusCode::NOT_FOUND);
        assert_eq!(first.head.line.reason, "Not Found");
        assert_eq!(&first.body[..], b"404 Not Found");

        let second = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.head.headers.get("transfer-encoding"), Some("chunked"));
        assert!(second.body.is_empty());
        assert_eq!(second.chunks, vec![Bytes::from_static(b"hello"), Bytes::from_static(b"world")]);
        assert!(buf.is_empty());
    }

    #[test]
    fn byte_by_byte() {
        let raw = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\ndata\r\n0\r\n\r\n";
        let mut decoder = ResponseDecoder::new();
        let mut buf = BytesMut::new();
        let mut decoded = Vec::new();

        for byte in raw.bytes() {
            buf.extend_from_slice(&[byte]);
            if let Some(response) = decoder.decode(&mut buf).unwrap() {
                decoded.push(response);
            }
        }

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].chunks, vec![Bytes::from_static(b"data")]);
    }

    #[test]
    fn head_only_ignores_announced_body() {
        let mut decoder = ResponseDecoder::new();
        decoder.set_head_only(true);
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nHTTP/1.1 204 No Content\r\n\r\n");

        let response = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(response.head.headers.get("Content-Length"), Some("5"));
        assert!(response.body.is_empty());

        let response = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(response.head.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn chunk_size_overflowing_usize() {
        let raw = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n1\r\na\r\nffffffffffffffff\r\n";
        let mut decoder = ResponseDecoder::new();
        let mut buf = BytesMut::from(raw);
        assert!(matches!(decoder.decode(&mut buf), Err(ParseError::TooLargeBody { .. })));

        let mut decoder = ResponseDecoder::with_limits(DEFAULT_MAX_HEADER_BYTES, usize::MAX);
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffff\r\n");
        assert!(matches!(decoder.decode(&mut buf), Err(ParseError::InvalidBody { .. })));
    }

    #[test]
    fn malformed_status_line() {
        let mut decoder = ResponseDecoder::new();
        let mut buf = BytesMut::from("HTTP/1.1 abc\r\n\r\n");
        assert!(decoder.decode(&mut buf).is_err());
    }
}
