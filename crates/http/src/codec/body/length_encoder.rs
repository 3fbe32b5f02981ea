use bytes::BytesMut;
use tokio_util::codec::Encoder;
use tracing::warn;

use crate::protocol::{PayloadItem, SendError};

/// Copies payload bytes through, never more than the announced length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }

    pub fn is_finish(&self) -> bool {
        self.length == 0
    }
}

impl Encoder<PayloadItem> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(bytes) => {
                let len = bytes.len() as u64;
                if len > self.length {
                    return Err(SendError::invalid_body(format!(
                        "payload of {len} bytes exceeds the remaining content-length {}",
                        self.length
                    )));
                }
                dst.extend_from_slice(&bytes);
                self.length -= len;
                Ok(())
            }
            PayloadItem::Eof => {
                if self.length != 0 {
                    warn!(remaining = self.length, "payload ended before content-length was reached");
                }
                Ok(())
            }
        }
    }
}
