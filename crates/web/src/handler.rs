use async_trait::async_trait;
use sealed_http::connection::Exchange;
use sealed_http::handler::HandlerFuture;
use sealed_http::protocol::HandlerError;

use crate::QueryParams;

/// What the router hands to a [`RouteHandler`] besides the exchange.
#[derive(Debug, Clone, Default)]
pub struct RouteContext {
    suffix: Vec<String>,
    query: QueryParams,
}

impl RouteContext {
    pub fn new(suffix: Vec<String>, query: QueryParams) -> Self {
        Self { suffix, query }
    }

    /// Path segments past the registered prefix.
    pub fn suffix(&self) -> &[String] {
        &self.suffix
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }
}

/// A handler registered in the [`Router`](crate::Router).
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn call(&self, route: RouteContext, exchange: &mut Exchange<'_>) -> Result<(), HandlerError>;
}

/// a closure holder which represents any route handler returning a boxed future
pub struct FnHandler<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> RouteHandler for FnHandler<F>
where
    F: for<'a, 'b> Fn(RouteContext, &'a mut Exchange<'b>) -> HandlerFuture<'a> + Send + Sync,
{
    async fn call(&self, route: RouteContext, exchange: &mut Exchange<'_>) -> Result<(), HandlerError> {
        (self.f)(route, exchange).await
    }
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a, 'b> Fn(RouteContext, &'a mut Exchange<'b>) -> HandlerFuture<'a> + Send + Sync,
{
    FnHandler { f }
}
