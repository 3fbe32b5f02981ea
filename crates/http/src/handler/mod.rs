//! The engine-facing handler contract.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::connection::Exchange;
use crate::protocol::{HandlerError, Request, Response, StatusError};

/// Serves the requests of every connection.
///
/// `call` reads the request from the [`Exchange`] and writes the response
/// into it, or streams it with the chunked API. Returning a
/// [`StatusError`] renders an error response; see
/// [`HttpConnection`](crate::connection::HttpConnection) for the rest of the
/// failure handling.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, exchange: &mut Exchange<'_>) -> Result<(), HandlerError>;

    /// Renders the response for a status error.
    ///
    /// `request` is `None` when the bytes never formed a request. Returning
    /// `None` selects the plain-text `"{code} {reason}"` body. Status, reason
    /// and extra headers of `error` are applied to whatever is returned.
    async fn render_error(&self, _error: &StatusError, _request: Option<&Request>) -> Option<Response> {
        None
    }
}

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>>;

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: for<'a, 'b> Fn(&'a mut Exchange<'b>) -> HandlerFuture<'a> + Send + Sync,
{
    async fn call(&self, exchange: &mut Exchange<'_>) -> Result<(), HandlerError> {
        (self.f)(exchange).await
    }
}

/// Wraps a closure returning a boxed future as a [`Handler`].
///
/// ```
/// use sealed_http::handler::make_handler;
/// use sealed_http::protocol::Response;
///
/// let handler = make_handler(|exchange| {
///     Box::pin(async move {
///         exchange.set_response(Response::with_body(http::StatusCode::OK, "text/plain", "hello"));
///         Ok(())
///     })
/// });
/// ```
pub fn make_handler<F>(f: F) -> HandlerFn<F>
where
    F: for<'a, 'b> Fn(&'a mut Exchange<'b>) -> HandlerFuture<'a> + Send + Sync,
{
    HandlerFn { f }
}
