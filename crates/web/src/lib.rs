//! Routing and the server loop on top of `sealed-http`.
//!
//! Handlers are registered once at startup in a [`Router`], a trie over path
//! segments. Each receives a [`RouteContext`] with the unmatched path suffix
//! and the parsed query, plus the connection's
//! [`Exchange`](sealed_http::connection::Exchange) to read the request and
//! write or stream the response.
//!
//! ```no_run
//! use http::{Method, StatusCode};
//! use sealed_http::protocol::{Request, Response, StatusError};
//! use sealed_web::{ErrorHandlers, ErrorScope, Router, Server, handler_fn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::builder()
//!         .route("/hello", &[Method::GET], 0, handler_fn(|route, exchange| {
//!             Box::pin(async move {
//!                 let name = route.query().get("name").unwrap_or("world").to_owned();
//!                 exchange.set_response(Response::with_body(StatusCode::OK, "text/plain", format!("hello {name}")));
//!                 Ok(())
//!             })
//!         }))
//!         .build();
//!
//!     let error_handlers = ErrorHandlers::new().with(ErrorScope::Default, |error: &StatusError, request: Option<&Request>| {
//!         let path = request.map_or("", Request::path);
//!         Some(Response::with_body(StatusCode::OK, "text/html", format!("<h1>Error: {error}</h1><p>{path}</p>")))
//!     });
//!
//!     let server = Server::builder()
//!         .router(router)
//!         .error_handlers(error_handlers)
//!         .address("127.0.0.1:3000")
//!         .build()
//!         .unwrap();
//!
//!     server.start().await.unwrap();
//! }
//! ```

mod handler;
mod query;
mod server;

pub mod config;
pub mod error_handler;
pub mod logging;
pub mod router;

pub use config::ServerConfig;
pub use error_handler::{ErrorHandler, ErrorHandlers, ErrorScope};
pub use handler::{FnHandler, RouteContext, RouteHandler, handler_fn};
pub use query::QueryParams;
pub use router::{RouteError, RouteMatch, Router};
pub use server::{Server, ServerBuildError, ServerBuilder, ServerError, ShutdownHandle};
