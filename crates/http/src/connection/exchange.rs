//! The handle a handler works through for one request.

use bytes::Bytes;
use futures::SinkExt;
use http::{Method, Version};
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;
use tracing::debug;

use crate::codec::ResponseEncoder;
use crate::protocol::{ChunkedState, Message, PayloadItem, PayloadSize, Request, Response, SendError};
use crate::secure::{AES_TRANSFER, ENCRYPTION_HEADER, SessionCipher};

pub(crate) type ResponseWriter = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, ResponseEncoder>;

/// Request-derived facts shaping every response on the connection.
#[derive(Debug, Clone)]
pub(crate) struct ReplyContext {
    version: Version,
    connection: String,
    head_only: bool,
    close: bool,
}

impl ReplyContext {
    /// Expects `Connection` to be defaulted on `request` already.
    pub(crate) fn of(request: &Request) -> Self {
        Self {
            version: request.version(),
            connection: request.header("Connection").unwrap_or("keep-alive").to_owned(),
            head_only: request.method() == Method::HEAD,
            close: request.wants_close(),
        }
    }

    /// Context for a reply to bytes that never formed a request.
    pub(crate) fn closing() -> Self {
        Self { version: Version::HTTP_11, connection: "close".to_owned(), head_only: false, close: true }
    }

    pub(crate) fn head_only(&self) -> bool {
        self.head_only
    }

    /// Mirrors the request version and `Connection` value, and marks encrypted responses.
    pub(crate) fn prepare(&self, response: &mut Response, encrypted: bool) {
        response.head.line.version = self.version;
        response.headers_mut().set_default("Connection", self.connection.as_str());
        if encrypted {
            response.set_header(ENCRYPTION_HEADER, AES_TRANSFER);
        }
    }

    /// True when either side asked for the connection to close.
    pub(crate) fn closes(&self, response: &Response) -> bool {
        self.close || response.header("Connection").is_some_and(|value| value.eq_ignore_ascii_case("close"))
    }
}

/// One request/response cycle on a connection.
///
/// Handlers read the [`Request`] and either fill in the [`Response`], which
/// the connection sends when the handler returns, or stream it with
/// [`launch`](Self::launch), [`transmit`](Self::transmit) and
/// [`finish`](Self::finish). A launched response must be finished before the
/// handler returns, and these calls must come in that order, otherwise the
/// connection is closed.
///
/// In encrypted mode bodies and chunk payloads are encrypted with the session
/// cipher on the way out; handlers only ever see plaintext.
pub struct Exchange<'conn> {
    request: Request,
    response: Response,
    writer: &'conn mut ResponseWriter,
    cipher: Option<&'conn SessionCipher>,
    context: ReplyContext,
}

impl<'conn> Exchange<'conn> {
    pub(crate) fn new(
        request: Request,
        writer: &'conn mut ResponseWriter,
        cipher: Option<&'conn SessionCipher>,
        context: ReplyContext,
    ) -> Self {
        Self { request, response: Response::default(), writer, cipher, context }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Replaces the response, keeping the chunked emission state.
    pub fn set_response(&mut self, response: Response) {
        let chunked = self.response.chunked;
        self.response = response;
        self.response.chunked = chunked;
    }

    /// True when the request arrived over the encrypted transport.
    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Starts a chunked response: drops `Content-Length`, sets
    /// `Transfer-Encoding: chunked` and flushes the head right away.
    pub async fn launch(&mut self) -> Result<(), SendError> {
        if self.response.chunked != ChunkedState::Idle {
            return Err(self.violation("response already launched"));
        }

        self.response.headers_mut().remove("Content-Length");
        self.response.set_header("Transfer-Encoding", "chunked");
        self.context.prepare(&mut self.response, self.cipher.is_some());

        let payload_size = if self.context.head_only() { PayloadSize::Empty } else { PayloadSize::Chunked };
        self.writer.send(Message::Header((self.response.head.clone(), payload_size))).await?;
        self.response.chunked = ChunkedState::Launched;
        debug!(status = self.response.status().as_u16(), "chunked response launched");
        Ok(())
    }

    /// Writes one chunk. Empty payloads are skipped since a zero-length
    /// chunk would end the body.
    pub async fn transmit(&mut self, payload: impl Into<Bytes>) -> Result<(), SendError> {
        if self.response.chunked != ChunkedState::Launched {
            return Err(self.violation("transmit without an active chunked response"));
        }

        let payload = payload.into();
        if payload.is_empty() || self.context.head_only() {
            return Ok(());
        }

        let payload = match self.cipher {
            Some(cipher) => Bytes::from(cipher.encrypt(&payload)?),
            None => payload,
        };
        self.writer.send(Message::Payload(PayloadItem::Chunk(payload))).await
    }

    /// Writes the terminating zero-length chunk.
    pub async fn finish(&mut self) -> Result<(), SendError> {
        if self.response.chunked != ChunkedState::Launched {
            return Err(self.violation("finish without an active chunked response"));
        }

        if !self.context.head_only() {
            self.writer.send(Message::Payload(PayloadItem::Eof)).await?;
        }
        self.response.chunked = ChunkedState::Finished;
        Ok(())
    }

    /// Marks the response as broken, so the connection closes whatever the handler returns.
    fn violation(&mut self, message: &'static str) -> SendError {
        self.response.chunked = ChunkedState::Violated;
        SendError::chunked_violation(message)
    }

    pub(crate) fn into_parts(self) -> (Request, Response) {
        (self.request, self.response)
    }
}

impl std::fmt::Debug for Exchange<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("request", &self.request)
            .field("response", &self.response)
            .field("encrypted", &self.cipher.is_some())
            .finish_non_exhaustive()
    }
}
