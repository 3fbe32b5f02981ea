//! Responses under construction by handlers.

use bytes::Bytes;
use http::{StatusCode, Version};

use crate::protocol::{Headers, StatusLine};

/// Status line plus headers: everything written before the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub line: StatusLine,
    pub headers: Headers,
}

impl ResponseHead {
    pub fn new(status: StatusCode) -> Self {
        Self { line: StatusLine::new(Version::HTTP_11, status), headers: Headers::new() }
    }

    pub fn status(&self) -> StatusCode {
        self.line.status
    }

    pub fn serialize(&self, dst: &mut Vec<u8>) {
        self.line.serialize(dst);
        dst.extend_from_slice(b"\r\n");
        self.headers.serialize(dst);
        dst.extend_from_slice(b"\r\n");
    }
}

/// Progress of chunked emission for one response.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ChunkedState {
    /// Nothing sent yet; the response goes out in one piece.
    #[default]
    Idle,
    /// Head flushed with `Transfer-Encoding: chunked`, chunks may follow.
    Launched,
    /// Terminating zero-length chunk written.
    Finished,
    /// A chunked call came out of order; the connection gets closed.
    Violated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub head: ResponseHead,
    pub body: Bytes,
    pub chunked: ChunkedState,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self { head: ResponseHead::new(status), body: Bytes::new(), chunked: ChunkedState::Idle }
    }

    /// A response with a body and its `Content-Type`.
    pub fn with_body(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Self {
        let mut response = Self::new(status);
        response.set_header("Content-Type", content_type);
        response.body = body.into();
        response
    }

    /// The plain-text fallback used for errors: `"{code} {reason}"`.
    pub fn plain_error(status: StatusCode, reason: &str) -> Self {
        let mut response = Self::with_body(
            status,
            mime::TEXT_PLAIN_UTF_8.as_ref(),
            format!("{} {}", status.as_u16(), reason),
        );
        response.head.line.reason = reason.to_owned();
        response
    }

    pub fn status(&self) -> StatusCode {
        self.head.line.status
    }

    /// Changes the status, resetting the reason to the canonical phrase.
    pub fn set_status(&mut self, status: StatusCode) {
        self.head.line = StatusLine::new(self.head.line.version, status);
    }

    pub fn set_reason(&mut self, reason: impl Into<String>) {
        self.head.line.reason = reason.into();
    }

    pub fn headers(&self) -> &Headers {
        &self.head.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.head.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.head.headers.set(name, value);
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    pub fn is_chunked(&self) -> bool {
        self.chunked != ChunkedState::Idle
    }

    /// Status line and headers only, as sent for `HEAD` requests.
    pub fn serialize_header(&self, dst: &mut Vec<u8>) {
        self.head.serialize(dst);
    }

    pub fn serialize(&self, dst: &mut Vec<u8>) {
        self.serialize_header(dst);
        dst.extend_from_slice(&self.body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_error_body() {
        let response = Response::plain_error(StatusCode::NOT_FOUND, "Not Found");
        assert_eq!(response.body, Bytes::from_static(b"404 Not Found"));
        assert_eq!(response.header("content-type"), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn serialize_with_and_without_body() {
        let mut response = Response::with_body(StatusCode::OK, "text/plain", "hi");
        response.set_header("Content-Length", "2");

        let mut head = Vec::new();
        response.serialize_header(&mut head);
        assert_eq!(head, b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\n");

        let mut full = Vec::new();
        response.serialize(&mut full);
        assert_eq!(full, b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nhi");
    }

    #[test]
    fn set_status_resets_reason() {
        let mut response = Response::default();
        response.set_reason("Fine");
        response.set_status(StatusCode::FORBIDDEN);
        assert_eq!(response.head.line.reason, "Forbidden");
    }
}
