//! An asynchronous HTTP/1.1 engine with an application-layer encrypted transport.
//!
//! The crate serves HTTP/1.1 over any `AsyncRead`/`AsyncWrite` pair on top of
//! tokio. It can wrap request and response bodies in a hybrid encryption scheme
//! negotiated per connection: an RSA keypair bootstraps an AES-128 session.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//! use sealed_http::connection::HttpConnection;
//! use sealed_http::handler::make_handler;
//! use sealed_http::protocol::Response;
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(|exchange| {
//!         Box::pin(async move {
//!             let body = format!("you asked for {}\r\n", exchange.request().path());
//!             exchange.set_response(Response::with_body(http::StatusCode::OK, "text/plain", body));
//!             Ok(())
//!         })
//!     }));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer);
//!             match connection.process(handler).await {
//!                 Ok(()) => info!("finished process, connection shutdown"),
//!                 Err(e) => error!("service has error, cause {}, connection shutdown", e),
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: message model, headers and the error taxonomy
//! - [`codec`]: incremental request and response assembly, response encoding
//! - [`secure`]: the RSA/AES handshake and session cipher
//! - [`connection`]: the per-connection engine and the [`connection::Exchange`] handle
//! - [`handler`]: the trait the engine dispatches to
//! - [`client`]: a small client for tools and tests
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - no TLS, the encrypted transport is an application-layer substitute
//! - request bodies are fully buffered before dispatch

pub mod client;
pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod secure;

mod utils;
pub(crate) use utils::ensure;
