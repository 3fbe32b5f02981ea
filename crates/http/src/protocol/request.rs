//! Assembled HTTP requests.

use bytes::Bytes;
use http::{Method, Version};

use crate::protocol::{Headers, ParseError, RequestLine};

/// A complete request as produced by the request decoder: line, headers and
/// the fully reassembled body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub line: RequestLine,
    pub headers: Headers,
    pub body: Bytes,
}

impl Request {
    pub fn new(line: RequestLine, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self { line, headers, body: body.into() }
    }

    pub fn method(&self) -> &Method {
        &self.line.method
    }

    pub fn version(&self) -> Version {
        self.line.version
    }

    /// The raw request target, query string included.
    pub fn path(&self) -> &str {
        &self.line.path
    }

    /// The request target without its query string.
    pub fn path_only(&self) -> &str {
        self.line.path.split_once('?').map_or(self.line.path.as_str(), |(path, _)| path)
    }

    pub fn query(&self) -> Option<&str> {
        self.line.path.split_once('?').map(|(_, query)| query)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Sets `Connection` from the protocol version when the client omitted it:
    /// `keep-alive` for HTTP/1.1, `close` otherwise.
    pub fn apply_default_connection(&mut self) {
        let value = if self.line.version == Version::HTTP_11 { "keep-alive" } else { "close" };
        self.headers.set_default("Connection", value);
    }

    /// True when the effective `Connection` header asks for closing.
    pub fn wants_close(&self) -> bool {
        match self.headers.get("Connection") {
            Some(value) => value.eq_ignore_ascii_case("close"),
            None => self.line.version != Version::HTTP_11,
        }
    }

    pub fn serialize(&self, dst: &mut Vec<u8>) {
        self.line.serialize(dst);
        dst.extend_from_slice(b"\r\n");
        self.headers.serialize(dst);
        dst.extend_from_slice(b"\r\n");
        dst.extend_from_slice(&self.body);
    }
}

/// Request line and headers, before the body is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub line: RequestLine,
    pub headers: Headers,
}

impl RequestHead {
    pub fn body(self, body: impl Into<Bytes>) -> Request {
        Request::new(self.line, self.headers, body)
    }
}

/// Converts a complete `httparse` head into a [`RequestHead`].
impl<'headers, 'buf> TryFrom<&httparse::Request<'headers, 'buf>> for RequestHead {
    type Error = ParseError;

    fn try_from(req: &httparse::Request<'headers, 'buf>) -> Result<Self, Self::Error> {
        let method = req.method.ok_or(ParseError::InvalidMethod)?;
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
        let path = req.path.filter(|path| !path.is_empty()).ok_or(ParseError::InvalidUri)?;
        let version = match req.version {
            Some(1) => Version::HTTP_11,
            Some(0) => Version::HTTP_10,
            other => return Err(ParseError::InvalidVersion(other)),
        };

        let mut headers = Headers::with_capacity(req.headers.len());
        for header in req.headers.iter() {
            let value = std::str::from_utf8(header.value).map_err(ParseError::invalid_header)?;
            headers.set(header.name, value);
        }

        Ok(Self { line: RequestLine::new(method, path, version), headers })
    }
}
