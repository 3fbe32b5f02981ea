//! Serves a directory tree, optionally over the encrypted transport.
//!
//! ```text
//! cargo run --example file_server -- --root ./public --port 8080
//! curl http://127.0.0.1:8080/docs/            # JSON listing
//! curl http://127.0.0.1:8080/docs/a.txt?chunked=1
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use http::{Method, StatusCode};
use sealed_http::connection::Exchange;
use sealed_http::protocol::{HandlerError, Request, Response, StatusError};
use sealed_web::{ErrorHandlers, ErrorScope, RouteContext, Router, Server, ServerConfig, handler_fn, logging};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tracing::{Level, error, info};

const CHUNK_SIZE: usize = 4096;

#[derive(Parser, Debug)]
#[command(about = "serve a directory tree over sealed-http")]
struct Args {
    /// Directory to serve
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[arg(long)]
    ip: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// JSON server config; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reject requests outside the encrypted transport
    #[arg(long)]
    require_encryption: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct Download {
    chunked: Option<u8>,
}

#[derive(Serialize, Debug)]
struct Entry {
    name: String,
    dir: bool,
    size: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match args.config.as_deref().map(ServerConfig::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("can't load config: {e}");
            return;
        }
    };
    if args.ip.is_some() || args.port.is_some() {
        let (default_ip, default_port) = config.address.rsplit_once(':').unwrap_or(("127.0.0.1", "8080"));
        let ip = args.ip.as_deref().unwrap_or(default_ip);
        let port = args.port.map_or_else(|| default_port.to_owned(), |port| port.to_string());
        config.address = format!("{ip}:{port}");
    }
    config.connection.require_encryption |= args.require_encryption;

    let level = match config.log_level() {
        Ok(level) => level.unwrap_or(Level::INFO),
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };
    logging::init(level);
    config.log_level = None;

    let root = Arc::new(args.root);
    info!(root = %root.display(), "serving files");

    let router = Router::builder()
        .route("/", &[Method::GET], 0, handler_fn(move |route, exchange| {
            Box::pin(serve_path(Arc::clone(&root), route, exchange))
        }))
        .build();

    let error_handlers = ErrorHandlers::new().with(ErrorScope::Default, |error: &StatusError, request: Option<&Request>| {
        let path = request.map_or("", Request::path_only);
        let page = format!("<h1>Error: {} {}</h1><p>{path}</p>", error.status().as_u16(), error.reason());
        Some(Response::with_body(StatusCode::OK, mime::TEXT_HTML_UTF_8.as_ref(), page))
    });

    let server = match Server::builder().router(router).error_handlers(error_handlers).config(config).build() {
        Ok(server) => server,
        Err(e) => {
            error!(cause = %e, "can't build server");
            return;
        }
    };

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            shutdown.shutdown();
        }
    });

    if let Err(e) = server.start().await {
        error!(cause = %e, "server stopped");
    }
}

async fn serve_path(root: Arc<PathBuf>, route: RouteContext, exchange: &mut Exchange<'_>) -> Result<(), HandlerError> {
    if route.suffix().iter().any(|segment| segment == ".." || segment.contains('\\')) {
        return Err(StatusError::forbidden().into());
    }
    let path = route.suffix().iter().fold(root.to_path_buf(), |path, segment| path.join(segment));

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(StatusError::not_found().into()),
        Err(e) => return Err(e.into()),
    };

    if metadata.is_dir() {
        return list_dir(&path, exchange).await;
    }

    let download: Download = route.query().deserialize()?;
    if download.chunked == Some(1) {
        stream_file(&path, exchange).await
    } else {
        let body = tokio::fs::read(&path).await?;
        exchange.set_response(Response::with_body(StatusCode::OK, content_type(&path).as_ref(), body));
        Ok(())
    }
}

async fn list_dir(path: &Path, exchange: &mut Exchange<'_>) -> Result<(), HandlerError> {
    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(path).await?;
    while let Some(entry) = dir.next_entry().await? {
        let metadata = entry.metadata().await?;
        entries.push(Entry {
            name: entry.file_name().to_string_lossy().into_owned(),
            dir: metadata.is_dir(),
            size: metadata.len(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let body = serde_json::to_vec(&entries).map_err(HandlerError::other)?;
    exchange.set_response(Response::with_body(StatusCode::OK, mime::APPLICATION_JSON.as_ref(), body));
    Ok(())
}

async fn stream_file(path: &Path, exchange: &mut Exchange<'_>) -> Result<(), HandlerError> {
    let mut file = tokio::fs::File::open(path).await?;
    exchange.response_mut().set_header("Content-Type", content_type(path).as_ref());
    exchange.launch().await?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        exchange.transmit(Bytes::copy_from_slice(&buf[..read])).await?;
    }

    exchange.finish().await?;
    Ok(())
}

fn content_type(path: &Path) -> mime::Mime {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();
    match extension.as_str() {
        "html" | "htm" => mime::TEXT_HTML_UTF_8,
        "txt" | "md" => mime::TEXT_PLAIN_UTF_8,
        "css" => mime::TEXT_CSS_UTF_8,
        "js" => mime::APPLICATION_JAVASCRIPT_UTF_8,
        "json" => mime::APPLICATION_JSON,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "svg" => mime::IMAGE_SVG,
        "pdf" => mime::APPLICATION_PDF,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}
