//! Request and status lines.

use std::fmt;
use std::str::FromStr;

use http::{Method, StatusCode, Version};

use crate::ensure;
use crate::protocol::ParseError;

/// `METHOD SP path SP version`, immutable once parsed.
///
/// `path` is the raw request target, query string included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub path: String,
    pub version: Version,
}

impl RequestLine {
    pub fn new(method: Method, path: impl Into<String>, version: Version) -> Self {
        Self { method, path: path.into(), version }
    }

    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut parts = line.split(' ');
        let (Some(method), Some(path), Some(version), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::invalid_line(line));
        };
        ensure!(!path.is_empty(), ParseError::InvalidUri);

        let method = Method::from_str(method).map_err(|_| ParseError::InvalidMethod)?;
        Ok(Self { method, path: path.to_owned(), version: parse_version(version)? })
    }

    pub fn serialize(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(self.to_string().as_bytes());
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.method, self.path, self.version)
    }
}

/// `version SP code SP reason`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub version: Version,
    pub status: StatusCode,
    pub reason: String,
}

impl StatusLine {
    /// Builds a status line carrying the canonical reason phrase of `status`.
    pub fn new(version: Version, status: StatusCode) -> Self {
        Self { version, status, reason: canonical_reason(status).to_owned() }
    }

    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut parts = line.splitn(3, ' ');
        let (Some(version), Some(code)) = (parts.next(), parts.next()) else {
            return Err(ParseError::invalid_line(line));
        };
        let status = StatusCode::from_str(code).map_err(|_| ParseError::invalid_line(line))?;
        let reason = parts.next().unwrap_or_default().to_owned();
        Ok(Self { version: parse_version(version)?, status, reason })
    }

    pub fn serialize(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(self.to_string().as_bytes());
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} {}", self.version, self.status.as_u16(), self.reason)
    }
}

pub(crate) fn canonical_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

fn parse_version(version: &str) -> Result<Version, ParseError> {
    match version {
        "HTTP/1.1" => Ok(Version::HTTP_11),
        "HTTP/1.0" => Ok(Version::HTTP_10),
        other => Err(ParseError::invalid_line(format!("unsupported version `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_line_round_trip() {
        let raw = "GET /index.html?user=1 HTTP/1.1";
        let line = RequestLine::parse(raw).unwrap();

        assert_eq!(line.method, Method::GET);
        assert_eq!(line.path, "/index.html?user=1");
        assert_eq!(line.version, Version::HTTP_11);
        assert_eq!(line.to_string(), raw);
    }

    #[test]
    fn request_line_needs_three_parts() {
        assert!(matches!(RequestLine::parse("GET /"), Err(ParseError::InvalidLine { .. })));
        assert!(matches!(RequestLine::parse("GET / HTTP/1.1 extra"), Err(ParseError::InvalidLine { .. })));
    }

    #[test]
    fn request_line_rejects_http2() {
        assert!(RequestLine::parse("GET / HTTP/2.0").is_err());
    }

    #[test]
    fn status_line_reason_with_spaces() {
        let raw = "HTTP/1.0 404 Not Found";
        let line = StatusLine::parse(raw).unwrap();

        assert_eq!(line.version, Version::HTTP_10);
        assert_eq!(line.status, StatusCode::NOT_FOUND);
        assert_eq!(line.reason, "Not Found");

        let mut out = Vec::new();
        line.serialize(&mut out);
        assert_eq!(out, raw.as_bytes());
    }

    #[test]
    fn status_line_default_reason() {
        let line = StatusLine::new(Version::HTTP_11, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(line.to_string(), "HTTP/1.1 405 Method Not Allowed");
    }
}
