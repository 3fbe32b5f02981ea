//! Encoder writing the status line and headers of a response.

use std::io::Write;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::helper::Writer;
use crate::protocol::{PayloadSize, ResponseHead, SendError};

const INIT_HEADER_SIZE: usize = 1024;

/// Writes a [`ResponseHead`], fixing up the framing headers first.
///
/// - `Length(n)` sets `Content-Length: n` and drops `Transfer-Encoding`
/// - `Chunked` sets `Transfer-Encoding: chunked` and drops `Content-Length`
/// - `Empty` writes the headers as they are, nothing follows on the wire
#[derive(Debug)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;

        match payload_size {
            PayloadSize::Length(n) => {
                head.headers.remove("Transfer-Encoding");
                head.headers.set("Content-Length", n.to_string());
            }
            PayloadSize::Chunked => {
                head.headers.remove("Content-Length");
                head.headers.set("Transfer-Encoding", "chunked");
            }
            PayloadSize::Empty => {}
        }

        dst.reserve(INIT_HEADER_SIZE);
        write!(Writer(dst), "{}\r\n", head.line)?;
        for (name, value) in head.headers.iter() {
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn length_replaces_transfer_encoding() {
        let mut head = ResponseHead::new(StatusCode::OK);
        head.headers.set("Transfer-Encoding", "chunked");
        head.headers.set("Content-Type", "text/plain");

        let mut dst = BytesMut::new();
        HeaderEncoder.encode((head, PayloadSize::Length(5)), &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\n");
    }

    #[test]
    fn empty_keeps_headers() {
        let mut head = ResponseHead::new(StatusCode::NOT_FOUND);
        head.headers.set("Content-Length", "13");

        let mut dst = BytesMut::new();
        HeaderEncoder.encode((head, PayloadSize::Empty), &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 404 Not Found\r\nContent-Length: 13\r\n\r\n");
    }
}
