//! Framing pieces shared by the request and response decoders.

use bytes::BytesMut;
use memchr::memmem;

use crate::ensure;
use crate::protocol::ParseError;

pub(crate) const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";
pub(crate) const CRLF: &[u8] = b"\r\n";

/// Upper bound of a chunk size line, extensions included
pub(crate) const MAX_CHUNK_LINE_BYTES: usize = 1024;

/// What a decoder waits for next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    /// exactly this many bytes
    Length(usize),
    /// every byte up to and including the delimiter
    Marker(&'static [u8]),
}

/// The current target plus how far the source was already searched for it.
#[derive(Debug)]
pub(crate) struct Cursor {
    target: Target,
    scanned: usize,
}

impl Cursor {
    pub(crate) fn new(target: Target) -> Self {
        Self { target, scanned: 0 }
    }

    pub(crate) fn target(&self) -> Target {
        self.target
    }

    pub(crate) fn set(&mut self, target: Target) {
        self.target = target;
        self.scanned = 0;
    }

    /// Splits the bytes satisfying the target off `src`, if present.
    ///
    /// A marker-delimited frame may not grow past `max_marker_len`; the error
    /// carries the length reached.
    pub(crate) fn acquire(&mut self, src: &mut BytesMut, max_marker_len: usize) -> Result<Option<BytesMut>, usize> {
        match self.target {
            Target::Length(len) => Ok((src.len() >= len).then(|| src.split_to(len))),
            Target::Marker(marker) => {
                // resume where the last search stopped, keeping room for a marker split across reads
                let start = self.scanned.saturating_sub(marker.len() - 1);
                match memmem::find(&src[start..], marker) {
                    Some(idx) => {
                        let end = start + idx + marker.len();
                        ensure!(end <= max_marker_len, end);
                        self.scanned = 0;
                        Ok(Some(src.split_to(end)))
                    }
                    None => {
                        ensure!(src.len() <= max_marker_len, src.len());
                        self.scanned = src.len();
                        Ok(None)
                    }
                }
            }
        }
    }
}

/// Parses a chunk size line; chunk extensions after `;` are ignored.
pub(crate) fn parse_chunk_size(line: &[u8]) -> Result<usize, ParseError> {
    let line = line.strip_suffix(CRLF).unwrap_or(line);
    let line = std::str::from_utf8(line).map_err(ParseError::invalid_body)?;
    let size = line.split(';').next().unwrap_or_default().trim();
    ensure!(!size.is_empty(), ParseError::invalid_body("empty chunk size"));
    usize::from_str_radix(size, 16).map_err(|e| ParseError::invalid_body(format!("invalid chunk size `{size}`: {e}")))
}

/// Target for the data of a `size` byte chunk and its CRLF, after `received`
/// body bytes, keeping the whole body within `max_body_bytes`.
pub(crate) fn chunk_data_target(received: usize, size: usize, max_body_bytes: usize) -> Result<Target, ParseError> {
    let current_size = received
        .checked_add(size)
        .ok_or_else(|| ParseError::too_large_body(usize::MAX, max_body_bytes))?;
    ensure!(current_size <= max_body_bytes, ParseError::too_large_body(current_size, max_body_bytes));
    let len = size
        .checked_add(CRLF.len())
        .ok_or_else(|| ParseError::invalid_body(format!("chunk size {size} overflows")))?;
    Ok(Target::Length(len))
}

/// The payload of a chunk data frame, without its closing CRLF.
pub(crate) fn chunk_payload(frame: &[u8]) -> Result<&[u8], ParseError> {
    frame.strip_suffix(CRLF).ok_or_else(|| ParseError::invalid_body("chunk data is not terminated by CRLF"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_split_across_reads() {
        let mut cursor = Cursor::new(Target::Marker(HEAD_TERMINATOR));
        let mut src = BytesMut::from("HTTP/1.1 200 OK\r\n\r");
        assert_eq!(cursor.acquire(&mut src, 64), Ok(None));

        src.extend_from_slice(b"\nrest");
        let frame = cursor.acquire(&mut src, 64).unwrap().unwrap();
        assert_eq!(&frame[..], b"HTTP/1.1 200 OK\r\n\r\n");
        assert_eq!(&src[..], b"rest");
    }

    #[test]
    fn marker_frame_too_long() {
        let mut cursor = Cursor::new(Target::Marker(CRLF));
        let mut src = BytesMut::from("ffffffff");
        assert_eq!(cursor.acquire(&mut src, 4), Err(8));
    }

    #[test]
    fn chunk_size_with_extension() {
        assert_eq!(parse_chunk_size(b"1A;name=value\r\n").unwrap(), 26);
        assert!(parse_chunk_size(b"\r\n").is_err());
        assert!(parse_chunk_size(b"xyz\r\n").is_err());
    }

    #[test]
    fn chunk_data_target_checks_overflow() {
        assert_eq!(chunk_data_target(3, 4, 16).unwrap(), Target::Length(6));
        assert!(matches!(chunk_data_target(10, 7, 16), Err(ParseError::TooLargeBody { .. })));
        assert!(matches!(chunk_data_target(1, usize::MAX, usize::MAX), Err(ParseError::TooLargeBody { .. })));
        assert!(matches!(chunk_data_target(0, usize::MAX, usize::MAX), Err(ParseError::InvalidBody { .. })));
    }
}
