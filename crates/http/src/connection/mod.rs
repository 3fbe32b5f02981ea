//! Connection engine.
//!
//! [`HttpConnection`] owns one accepted connection and drives it until close:
//!
//! - requests are assembled by the [`RequestDecoder`](crate::codec::RequestDecoder)
//! - the `MyEncryption` header drives the [`secure`](crate::secure) handshake;
//!   handshake steps are answered here and never reach the handler
//! - every other request is handed to the [`Handler`](crate::handler::Handler)
//!   through an [`Exchange`]
//! - status errors become error responses, other failures and panics become
//!   500; framing errors answer 400 and close
//! - `Connection: close` on either side ends the connection after the response

mod config;
mod exchange;
mod http_connection;

pub use config::{ConnectionConfig, DEFAULT_READ_BUFFER_CAPACITY};
pub use exchange::Exchange;
pub use http_connection::HttpConnection;
