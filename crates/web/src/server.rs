//! The listener and its accept loop.
//!
//! Every accepted connection runs as its own task in a [`JoinSet`], driven by
//! a [`HttpConnection`] that owns all of its state. The routing table and the
//! error renderers are shared read-only. [`ShutdownHandle::shutdown`] stops
//! accepting, drops the listener and aborts every live connection without
//! waiting for in-flight requests.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use sealed_http::connection::{ConnectionConfig, Exchange, HttpConnection};
use sealed_http::handler::Handler;
use sealed_http::protocol::{HandlerError, Request, Response, StatusError};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, ServerConfig};
use crate::error_handler::ErrorHandlers;
use crate::handler::RouteContext;
use crate::router::Router;
use crate::{QueryParams, logging};

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug)]
pub struct ServerBuilder {
    router: Option<Router>,
    error_handlers: ErrorHandlers,
    config: ServerConfig,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: None, error_handlers: ErrorHandlers::new(), config: ServerConfig::default() }
    }

    #[must_use]
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    #[must_use]
    pub fn error_handlers(mut self, error_handlers: ErrorHandlers) -> Self {
        self.error_handlers = error_handlers;
        self
    }

    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        Ok(Server {
            router,
            error_handlers: self.error_handlers,
            config: self.config,
            shutdown: CancellationToken::new(),
        })
    }
}

/// Stops a running [`Server`] from another task.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
pub struct Server {
    router: Router,
    error_handlers: ErrorHandlers,
    config: ServerConfig,
    shutdown: CancellationToken,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle { token: self.shutdown.clone() }
    }

    /// Installs logging if configured, binds the configured address and serves
    /// until shut down.
    pub async fn start(self) -> Result<(), ServerError> {
        if let Some(level) = self.config.log_level()? {
            logging::init(level);
        }

        info!("start listening at {}", self.config.address);
        let tcp_listener = match TcpListener::bind(self.config.address.as_str()).await {
            Ok(tcp_listener) => tcp_listener,
            Err(source) => {
                error!(cause = %source, "bind server error");
                return Err(ServerError::Bind { address: self.config.address.clone(), source });
            }
        };

        self.serve(tcp_listener).await;
        Ok(())
    }

    /// Serves connections accepted from `tcp_listener` until shut down.
    pub async fn serve(self, tcp_listener: TcpListener) {
        let connection_config = self.config.connection_config();
        let shutdown = self.shutdown.clone();
        let handler = Arc::new(self);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,

                accepted = tcp_listener.accept() => {
                    let (tcp_stream, remote_addr) = match accepted {
                        Ok(stream_and_addr) => stream_and_addr,
                        Err(e) => {
                            warn!(cause = %e, "failed to accept");
                            continue;
                        }
                    };
                    debug!(%remote_addr, "accepted connection");
                    connections.spawn(serve_connection(tcp_stream, Arc::clone(&handler), connection_config.clone()));
                }

                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        error!(cause = %e, "connection task failed");
                    }
                }
            }
        }

        drop(tcp_listener);
        info!(connections = connections.len(), "shutting down, aborting live connections");
        connections.shutdown().await;
    }
}

async fn serve_connection(tcp_stream: TcpStream, handler: Arc<Server>, config: ConnectionConfig) {
    let (reader, writer) = tcp_stream.into_split();
    let connection = HttpConnection::with_config(reader, writer, config);
    match connection.process(handler).await {
        Ok(()) => {
            info!("finished process, connection shutdown");
        }
        Err(e) => {
            error!("service has error, cause {}, connection shutdown", e);
        }
    }
}

#[async_trait]
impl Handler for Server {
    async fn call(&self, exchange: &mut Exchange<'_>) -> Result<(), HandlerError> {
        let request = exchange.request();
        debug!(method = %request.method(), path = request.path(), "dispatching");

        let matched = self.router.resolve(request.path_only(), request.method()).map_err(StatusError::from)?;
        let query = request.query().map(QueryParams::parse).transpose()?.unwrap_or_default();

        let handler = matched.handler();
        handler.call(RouteContext::new(matched.into_suffix(), query), exchange).await
    }

    async fn render_error(&self, error: &StatusError, request: Option<&Request>) -> Option<Response> {
        self.error_handlers.render(error, request)
    }
}
