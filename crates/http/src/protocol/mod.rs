//! Message model: request and status lines, headers, assembled requests,
//! responses under construction and the error taxonomy.
//!
//! - [`Headers`]: ordered, case-insensitive header collection
//! - [`RequestLine`] / [`StatusLine`]: first line of a request or response
//! - [`Request`]: a fully assembled request, body included
//! - [`Response`]: the response a handler builds, with its chunked state
//! - [`Message`], [`PayloadItem`], [`PayloadSize`]: outbound frames consumed
//!   by the response encoder
//!
//! Errors:
//!
//! - [`ParseError`]: framing errors, fatal to the connection
//! - [`SendError`]: response emission errors, fatal to the connection
//! - [`StatusError`]: rendered into an error response
//! - [`HandlerError`]: what handlers return

mod header;
pub use header::Headers;

mod line;
pub use line::RequestLine;
pub use line::StatusLine;

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::Request;
pub use request::RequestHead;

mod response;
pub use response::ChunkedState;
pub use response::Response;
pub use response::ResponseHead;

mod error;
pub use error::HandlerError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
pub use error::StatusError;
