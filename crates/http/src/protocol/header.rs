//! Ordered, case-insensitive header collection.
//!
//! [`Headers`] keeps the insertion order of header names so that a parsed
//! block serializes back to the same bytes, while every lookup and write
//! compares names ignoring ASCII case. Duplicate names are not modeled:
//! setting a name that already exists replaces the value in place.

use std::fmt;

use crate::ensure;
use crate::protocol::ParseError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Sets `name` to `value`.
    ///
    /// An existing entry keeps its position and original name casing; only
    /// its value changes. New names are appended.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Sets `name` only when it is not present yet.
    pub fn set_default(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.entries.push((name, value.into()));
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges every entry of `other` into `self`, `other` winning on conflicts.
    pub fn merge(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.set(name, value);
        }
    }

    /// Parses a header block: `name: value` lines separated by CRLF.
    ///
    /// The block must not contain the terminating empty line. Whitespace
    /// around values is trimmed, names are kept verbatim.
    pub fn parse(block: &str) -> Result<Self, ParseError> {
        let mut headers = Headers::new();
        for line in block.split("\r\n").filter(|line| !line.is_empty()) {
            let Some((name, value)) = line.split_once(':') else {
                return Err(ParseError::invalid_header(format!("missing colon in `{line}`")));
            };
            ensure!(!name.is_empty() && !name.contains(' '), ParseError::invalid_header(format!("bad name `{name}`")));
            headers.set(name, value.trim());
        }
        Ok(headers)
    }

    /// Writes every entry as `name: value\r\n`, in insertion order.
    pub fn serialize(&self, dst: &mut Vec<u8>) {
        for (name, value) in self.iter() {
            dst.extend_from_slice(name.as_bytes());
            dst.extend_from_slice(b": ");
            dst.extend_from_slice(value.as_bytes());
            dst.extend_from_slice(b"\r\n");
        }
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.set(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");

        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(headers.contains("content-TYPE"));
    }

    #[test]
    fn last_write_wins_in_place() {
        let mut headers = Headers::new();
        headers.set("Host", "a");
        headers.set("Accept", "*/*");
        headers.set("host", "b");

        assert_eq!(headers.len(), 2);
        let entries: Vec<_> = headers.iter().collect();
        assert_eq!(entries, vec![("Host", "b"), ("Accept", "*/*")]);
    }

    #[test]
    fn set_default_keeps_existing() {
        let mut headers = Headers::new();
        headers.set("Connection", "close");
        headers.set_default("connection", "keep-alive");
        headers.set_default("Server", "sealed");

        assert_eq!(headers.get("Connection"), Some("close"));
        assert_eq!(headers.get("server"), Some("sealed"));
    }

    #[test]
    fn remove_entry() {
        let mut headers: Headers = [("Content-Length", "3"), ("Host", "x")].into_iter().collect();
        assert_eq!(headers.remove("content-length").as_deref(), Some("3"));
        assert_eq!(headers.remove("content-length"), None);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn parse_then_serialize_is_identity() {
        let raw = "Host: 127.0.0.1:8080\r\nUser-Agent: curl/7.79.1\r\nAccept: */*\r\n";
        let headers = Headers::parse(raw).unwrap();

        let mut out = Vec::new();
        headers.serialize(&mut out);
        assert_eq!(out, raw.as_bytes());
        assert_eq!(headers.to_string(), raw);
    }

    #[test]
    fn parse_rejects_missing_colon() {
        let result = Headers::parse("Host 127.0.0.1\r\n");
        assert!(matches!(result, Err(ParseError::InvalidHeader { .. })));
    }

    #[test]
    fn merge_overrides() {
        let mut base: Headers = [("Content-Type", "text/plain"), ("Connection", "keep-alive")].into_iter().collect();
        let extra: Headers = [("connection", "close"), ("WWW-Authenticate", "Basic")].into_iter().collect();
        base.merge(&extra);

        assert_eq!(base.get("Connection"), Some("close"));
        assert_eq!(base.get("www-authenticate"), Some("Basic"));
        assert_eq!(base.len(), 3);
    }
}
