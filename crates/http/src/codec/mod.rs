//! Wire codecs.
//!
//! - [`RequestDecoder`]: reassembles complete requests from a byte stream,
//!   `Content-Length` and chunked bodies included
//! - [`ResponseEncoder`]: writes response heads and payloads, either length
//!   delimited or chunked
//! - [`ResponseDecoder`]: the client side, reassembling responses
//!
//! All plug into `tokio_util::codec::{Framed, FramedRead, FramedWrite}`.

mod body;
mod framing;
mod header;
mod helper;
mod request_decoder;
mod response_decoder;
mod response_encoder;

pub use request_decoder::DEFAULT_MAX_BODY_BYTES;
pub use request_decoder::DEFAULT_MAX_HEADER_BYTES;
pub use request_decoder::RequestDecoder;
pub use response_decoder::{ReceivedResponse, ResponseDecoder};
pub use response_encoder::ResponseEncoder;
