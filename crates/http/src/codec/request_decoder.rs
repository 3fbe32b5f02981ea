//! Incremental request assembly.
//!
//! [`RequestDecoder`] turns an arbitrarily fragmented byte stream into a
//! sequence of complete [`Request`]s. It keeps a *target*, either a byte
//! count or a delimiter, and a *state* telling what the bytes satisfying the
//! target mean:
//!
//! ```text
//! Head --CL--> BodyByLength ----------------------------> Complete
//!   \--TE--> ChunkSize <--> ChunkData --zero chunk------> Complete
//! ```
//!
//! Bytes beyond the current message stay in the source buffer and are picked
//! up by the next call, so pipelined requests are emitted one by one in
//! arrival order.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use sealed_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buf = BytesMut::from(&b"POST /echo HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n4\r\ndata\r\n0\r\n\r\n"[..]);
//! let request = decoder.decode(&mut buf).unwrap().unwrap();
//! assert_eq!(&request.body[..], b"data");
//! ```

use bytes::BytesMut;
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::framing::{
    CRLF, Cursor, HEAD_TERMINATOR, MAX_CHUNK_LINE_BYTES, Target, chunk_data_target, chunk_payload, parse_chunk_size,
};
use crate::ensure;
use crate::protocol::{ParseError, Request, RequestHead};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Default limit for the request line plus header block
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

/// Default limit for an assembled body
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Head,
    BodyByLength,
    ChunkSize,
    ChunkData,
    Complete,
}

#[derive(Debug)]
pub struct RequestDecoder {
    max_header_bytes: usize,
    max_body_bytes: usize,
    state: State,
    cursor: Cursor,
    head: Option<RequestHead>,
    body: BytesMut,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_limits(max_header_bytes: usize, max_body_bytes: usize) -> Self {
        Self { max_header_bytes, max_body_bytes, ..Default::default() }
    }

    /// True when no partial message is buffered by the decoder itself.
    pub fn is_idle(&self) -> bool {
        self.state == State::Head && self.head.is_none()
    }

    fn reset(&mut self) {
        self.state = State::Head;
        self.cursor.set(Target::Marker(HEAD_TERMINATOR));
    }

    /// Splits the bytes satisfying the current target off `src`, if present.
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

    /// Consumes one satisfied target and moves to the next state.
    fn advance(&mut self, frame: BytesMut) -> Result<(), ParseError> {
        match self.state {
            State::Head => {
                let head = parse_head(&frame)?;
                self.begin_body(&head)?;
                self.head = Some(head);
            }
            State::BodyByLength => {
                self.body = frame;
                self.state = State::Complete;
            }
            State::ChunkSize => {
                let size = parse_chunk_size(&frame)?;
                self.cursor.set(chunk_data_target(self.body.len(), size, self.max_body_bytes)?);
                self.state = State::ChunkData;
            }
            State::ChunkData => {
                let payload = chunk_payload(&frame)?;
                if payload.is_empty() {
                    self.state = State::Complete;
                } else {
                    self.body.extend_from_slice(payload);
                    self.cursor.set(Target::Marker(CRLF));
                    self.state = State::ChunkSize;
                }
            }
            State::Complete => {}
        }
        Ok(())
    }

    /// Picks the body framing announced by the head.
    ///
    /// `Content-Length` wins over `Transfer-Encoding`; with neither the body is empty.
    fn begin_body(&mut self, head: &RequestHead) -> Result<(), ParseError> {
        if let Some(value) = head.headers.get("Content-Length") {
            let len = value.trim().parse::<usize>().map_err(ParseError::invalid_content_length)?;
            ensure!(len <= self.max_body_bytes, ParseError::too_large_body(len, self.max_body_bytes));
            self.cursor.set(Target::Length(len));
            self.state = State::BodyByLength;
        } else if head.headers.contains("Transfer-Encoding") {
            self.body = BytesMut::new();
            self.cursor.set(Target::Marker(CRLF));
            self.state = State::ChunkSize;
        } else {
            self.cursor.set(Target::Length(0));
            self.state = State::BodyByLength;
        }
        trace!(state = ?self.state, target = ?self.cursor.target(), "request head parsed");
        Ok(())
    }

    fn emit(&mut self) -> Result<Request, ParseError> {
        let head = self.head.take().ok_or_else(|| ParseError::invalid_body("body without a request head"))?;
        let body = self.body.split().freeze();
        self.reset();
        Ok(head.body(body))
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self {
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            state: State::Head,
            cursor: Cursor::new(Target::Marker(HEAD_TERMINATOR)),
            head: None,
            body: BytesMut::new(),
        }
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    /// Returns the next complete request, or `Ok(None)` when more bytes are needed.
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

fn parse_head(bytes: &[u8]) -> Result<RequestHead, ParseError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
    let mut req = httparse::Request::new(&mut headers);

    let status = req.parse(bytes).map_err(|e| match e {
        Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
        Error::Version => ParseError::InvalidVersion(None),
        Error::Token => ParseError::InvalidMethod,
        e => ParseError::invalid_header(e),
    })?;

    match status {
        Status::Complete(_) => RequestHead::try_from(&req),
        Status::Partial => Err(ParseError::invalid_line("incomplete request head")),
    }
}
