use std::error::Error as StdError;
use std::fmt;
use std::io;

use http::StatusCode;
use thiserror::Error;

use crate::protocol::{Headers, line::canonical_reason};
use crate::secure::CipherError;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

/// Framing errors raised while assembling a request. Always fatal to the
/// connection: the byte stream cannot be resynchronized afterwards.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid request or status line: {reason}")]
    InvalidLine { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("body size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeBody { current_size: usize, max_size: usize },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn too_large_body(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeBody { current_size, max_size }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_line<S: ToString>(str: S) -> Self {
        Self::InvalidLine { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Failures while emitting a response. Always fatal to the connection.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("chunked transfer violation: {reason}")]
    ChunkedViolation { reason: String },

    #[error("failed to encrypt response: {source}")]
    Cipher {
        #[from]
        source: CipherError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn chunked_violation<S: ToString>(str: S) -> Self {
        Self::ChunkedViolation { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// A protocol-level failure that is rendered into an error response.
///
/// Carries the status, the reason phrase and extra headers (for instance
/// `WWW-Authenticate` or `Set-Cookie`) merged into the rendered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    status: StatusCode,
    reason: String,
    headers: Headers,
}

impl StatusError {
    pub fn new(status: StatusCode) -> Self {
        Self { status, reason: canonical_reason(status).to_owned(), headers: Headers::new() }
    }

    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED)
    }

    pub fn range_not_satisfiable() -> Self {
        Self::new(StatusCode::RANGE_NOT_SATISFIABLE)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.reason)
    }
}

impl StdError for StatusError {}

impl From<StatusCode> for StatusError {
    fn from(status: StatusCode) -> Self {
        Self::new(status)
    }
}

/// What a handler may fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Rendered into an error response with the carried status.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// The response could not be written; the connection is closed.
    #[error(transparent)]
    Send(#[from] SendError),

    /// Anything else; rendered as 500.
    #[error("handler failed: {0}")]
    Other(Box<dyn StdError + Send + Sync>),
}

impl HandlerError {
    pub fn other<E: Into<Box<dyn StdError + Send + Sync>>>(e: E) -> Self {
        Self::Other(e.into())
    }
}

impl From<io::Error> for HandlerError {
    fn from(e: io::Error) -> Self {
        Self::Other(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_defaults_to_canonical_reason() {
        let err = StatusError::not_found();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.reason(), "Not Found");
        assert_eq!(err.to_string(), "404 Not Found");
    }

    #[test]
    fn status_error_custom_reason_and_headers() {
        let err = StatusError::unauthorized()
            .with_reason("Login Required")
            .with_header("WWW-Authenticate", "Basic realm=\"files\"");

        assert_eq!(err.reason(), "Login Required");
        assert_eq!(err.headers().get("www-authenticate"), Some("Basic realm=\"files\""));
    }

    #[test]
    fn io_error_is_other() {
        let err: HandlerError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, HandlerError::Other(_)));
    }
}
