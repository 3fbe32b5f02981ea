use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::connection::ConnectionConfig;
use crate::connection::exchange::{Exchange, ReplyContext, ResponseWriter};
use crate::handler::Handler;
use crate::protocol::{
    ChunkedState, HandlerError, HttpError, Message, ParseError, PayloadSize, Request, Response, SendError,
    StatusError, StatusLine,
};
use crate::secure::{AES_KEY_ACK, ENCRYPTION_HEADER, EncryptionOp, Handshake, PUBLIC_KEY_RESPONSE, SessionCipher};

/// One accepted connection: request assembly, the encryption handshake,
/// dispatch and response emission.
///
/// Requests are handled strictly one after another. The next request is not
/// decoded before the response to the previous one has been written.
pub struct HttpConnection<R> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: ResponseWriter,
    handshake: Handshake,
    config: ConnectionConfig,
}

impl<R> HttpConnection<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new<W>(reader: R, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::with_config(reader, writer, ConnectionConfig::default())
    }

    pub fn with_config<W>(reader: R, writer: W, config: ConnectionConfig) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let decoder = RequestDecoder::with_limits(config.max_header_bytes, config.max_body_bytes);
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
        Self {
            framed_read: FramedRead::with_capacity(reader, decoder, config.read_buffer_capacity),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            handshake: Handshake::new(config.rsa_key_bits),
            config,
        }
    }

    /// Serves requests until the peer goes away, a `Connection: close`
    /// exchange completes or a fatal error occurs. The write half is shut
    /// down before returning.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        let result = self.serve(handler.as_ref()).await;
        if let Err(e) = self.framed_write.get_mut().shutdown().await {
            debug!(cause = %e, "shutdown write half failed");
        }
        result
    }

    async fn serve<H>(&mut self, handler: &H) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(request)) => {
                    if self.do_process(request, handler).await? {
                        info!("connection close requested, shutdown");
                        return Ok(());
                    }
                }

                Some(Err(ParseError::Io { source })) => {
                    info!(cause = %source, "read failed, connection shutdown");
                    return Ok(());
                }

                Some(Err(e)) => {
                    error!(cause = %e, "can't receive next request");
                    self.send_failure(StatusError::bad_request().into(), handler, None, &ReplyContext::closing(), None)
                        .await?;
                    return Err(e.into());
                }

                None => {
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    /// Handles one request; returns true when the connection must close.
    async fn do_process<H>(&mut self, mut request: Request, handler: &H) -> Result<bool, HttpError>
    where
        H: Handler + ?Sized,
    {
        request.apply_default_connection();
        let context = ReplyContext::of(&request);
        debug!(method = %request.method(), path = request.path(), "request received");

        let op = match request.header(ENCRYPTION_HEADER).map(EncryptionOp::parse).transpose() {
            Ok(op) => op,
            Err(e) => return self.send_failure(e.into(), handler, Some(&request), &context, None).await,
        };

        let outcome = match op {
            Some(EncryptionOp::Request) => self
                .handshake
                .issue_public_key()
                .await
                .map(|pem| marked(Response::with_body(http::StatusCode::OK, "text/plain", pem), PUBLIC_KEY_RESPONSE)),
            Some(EncryptionOp::AesKey) => self
                .handshake
                .accept_session_key(&request.body)
                .map(|()| marked(Response::new(http::StatusCode::OK), AES_KEY_ACK)),
            Some(EncryptionOp::AesTransfer) => return self.dispatch_encrypted(request, handler, &context).await,
            None if self.config.require_encryption => {
                Err(StatusError::bad_request().with_reason("Encryption Required").into())
            }
            None => return self.dispatch(request, handler, &context, None).await,
        };

        match outcome {
            Ok(response) => self.send_full(response, &context, None).await,
            Err(e) => self.send_failure(e, handler, Some(&request), &context, None).await,
        }
    }

    async fn dispatch_encrypted<H>(
        &mut self,
        mut request: Request,
        handler: &H,
        context: &ReplyContext,
    ) -> Result<bool, HttpError>
    where
        H: Handler + ?Sized,
    {
        let cipher = match self.handshake.session().cloned() {
            Ok(cipher) => cipher,
            Err(e) => return self.send_failure(e.into(), handler, Some(&request), context, None).await,
        };

        if !request.body.is_empty() {
            match cipher.decrypt(&request.body) {
                Ok(plaintext) => {
                    request.headers.set("Content-Length", plaintext.len().to_string());
                    request.body = plaintext.into();
                }
                Err(e) => {
                    warn!(cause = %e, "unable to decrypt request body");
                    let err = StatusError::bad_request().into();
                    return self.send_failure(err, handler, Some(&request), context, Some(&cipher)).await;
                }
            }
        }

        self.dispatch(request, handler, context, Some(&cipher)).await
    }

    async fn dispatch<H>(
        &mut self,
        request: Request,
        handler: &H,
        context: &ReplyContext,
        cipher: Option<&SessionCipher>,
    ) -> Result<bool, HttpError>
    where
        H: Handler + ?Sized,
    {
        let mut exchange = Exchange::new(request, &mut self.framed_write, cipher, context.clone());
        let result = AssertUnwindSafe(handler.call(&mut exchange)).catch_unwind().await.unwrap_or_else(|panic| {
            let cause = panic_message(panic.as_ref());
            error!(cause = %cause, "handler panicked");
            Err(HandlerError::other(cause))
        });
        let (request, response) = exchange.into_parts();

        match (result, response.chunked) {
            (Err(HandlerError::Send(e)), _) => {
                error!(cause = %e, "failed to send response");
                Err(e.into())
            }
            (_, ChunkedState::Violated) => {
                error!("chunked calls out of order");
                Err(SendError::chunked_violation("chunked calls out of order").into())
            }
            (Ok(()), ChunkedState::Idle) => self.send_full(response, context, cipher).await,
            (Ok(()), ChunkedState::Finished) => Ok(context.closes(&response)),
            (Ok(()), ChunkedState::Launched) => {
                error!("chunked response was not finished");
                Err(SendError::chunked_violation("chunked response was not finished").into())
            }
            (Err(e), ChunkedState::Idle) => self.send_failure(e, handler, Some(&request), context, cipher).await,
            (Err(e), _) => {
                error!(cause = %e, "handler failed after the chunked response started");
                Err(SendError::chunked_violation("handler failed after launch").into())
            }
        }
    }

    /// Renders a failure into an error response and sends it.
    async fn send_failure<H>(
        &mut self,
        error: HandlerError,
        handler: &H,
        request: Option<&Request>,
        context: &ReplyContext,
        cipher: Option<&SessionCipher>,
    ) -> Result<bool, HttpError>
    where
        H: Handler + ?Sized,
    {
        let status_error = match error {
            HandlerError::Status(e) => {
                info!(status = e.status().as_u16(), reason = e.reason(), "request failed");
                e
            }
            HandlerError::Send(e) => return Err(e.into()),
            HandlerError::Other(cause) => {
                error!(cause = %cause, "handle request error, respond 500");
                StatusError::internal()
            }
        };

        let mut response = match handler.render_error(&status_error, request).await {
            Some(response) => response,
            None => Response::plain_error(status_error.status(), status_error.reason()),
        };
        response.head.line = StatusLine {
            version: response.head.line.version,
            status: status_error.status(),
            reason: status_error.reason().to_owned(),
        };
        response.headers_mut().merge(status_error.headers());

        self.send_full(response, context, cipher).await
    }

    /// Sends a complete response; only its head for `HEAD` requests.
    async fn send_full(
        &mut self,
        mut response: Response,
        context: &ReplyContext,
        cipher: Option<&SessionCipher>,
    ) -> Result<bool, HttpError> {
        context.prepare(&mut response, cipher.is_some());
        if let Some(cipher) = cipher {
            response.body = cipher.encrypt(&response.body).map_err(SendError::from)?.into();
        }

        let close = context.closes(&response);
        let length = response.body.len() as u64;
        if context.head_only() {
            response.set_header("Content-Length", length.to_string());
            self.framed_write.send(Message::Header((response.head, PayloadSize::Empty))).await?;
        } else {
            self.framed_write.feed(Message::Header((response.head, PayloadSize::Length(length)))).await?;
            if length > 0 {
                self.framed_write.feed(Message::from(response.body)).await?;
            }
            self.framed_write.flush().await?;
        }

        Ok(close)
    }
}

fn marked(mut response: Response, marker: &str) -> Response {
    response.set_header(ENCRYPTION_HEADER, marker);
    response
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_owned()
    }
}
