use std::io::Write;

use bytes::BytesMut;
use tokio_util::codec::Encoder;

use crate::codec::helper::Writer;
use crate::protocol::{PayloadItem, SendError};

/// Frames payload items as `HEX(len)\r\n payload \r\n`, closing with `0\r\n\r\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
    send_size: usize,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false, send_size: 0 }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl Encoder<PayloadItem> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Err(SendError::chunked_violation("chunk written after the terminating chunk"));
        }

        match item {
            // a zero-length frame would end the body
            PayloadItem::Chunk(bytes) if bytes.is_empty() => Ok(()),
            PayloadItem::Chunk(bytes) => {
                write!(Writer(dst), "{:X}\r\n", bytes.len())?;
                dst.reserve(bytes.len() + 2);
                dst.extend_from_slice(&bytes);
                dst.extend_from_slice(b"\r\n");
                self.send_size += bytes.len();
                Ok(())
            }
            PayloadItem::Eof => {
                self.eof = true;
                dst.extend_from_slice(b"0\r\n\r\n");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn frame_carries_hex_length() {
        let payload = Bytes::from(vec![b'x'; 300]);
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::Chunk(payload.clone()), &mut dst).unwrap();

        let split = dst.iter().position(|b| *b == b'\r').unwrap();
        let len = usize::from_str_radix(std::str::from_utf8(&dst[..split]).unwrap(), 16).unwrap();
        assert_eq!(len, payload.len());
        assert_eq!(&dst[..split], b"12C");
        assert_eq!(&dst[split + 2..split + 2 + len], &payload[..]);
        assert_eq!(&dst[split + 2 + len..], b"\r\n");
    }

    #[test]
    fn eof_terminates() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"data")), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::new()), &mut dst).unwrap();
        encoder.encode(PayloadItem::Eof, &mut dst).unwrap();

        assert_eq!(&dst[..], b"4\r\ndata\r\n0\r\n\r\n");
        assert!(encoder.is_finish());
        assert!(matches!(
            encoder.encode(PayloadItem::Eof, &mut dst),
            Err(SendError::ChunkedViolation { .. })
        ));
    }
}
