//! A minimal HTTP/1.1 client speaking the encrypted transport.
//!
//! Meant for tools and tests: it writes [`Request`]s, reads responses with
//! either framing and performs the client side of the handshake.
//!
//! ```no_run
//! # async fn run() -> Result<(), sealed_http::client::ClientError> {
//! use sealed_http::client::Client;
//! use sealed_http::protocol::{Headers, Request, RequestLine};
//!
//! let stream = tokio::net::TcpStream::connect("127.0.0.1:8080").await?;
//! let mut client = Client::new(stream);
//! client.handshake().await?;
//!
//! let line = RequestLine::new(http::Method::GET, "/index.html", http::Version::HTTP_11);
//! let response = client.encrypted_round_trip(Request::new(line, Headers::new(), "")).await?;
//! println!("{}", String::from_utf8_lossy(&response.body));
//! # Ok(())
//! # }
//! ```

use std::io;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use http::{Method, StatusCode, Version};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Framed;

use crate::codec::{ReceivedResponse, ResponseDecoder};
use crate::protocol::{Headers, ParseError, Request, RequestLine, StatusLine};
use crate::secure::{AES_TRANSFER, CipherError, ENCRYPTION_HEADER, EncryptionOp, PublicKey, SessionCipher};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("malformed response: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("cipher error: {source}")]
    Cipher {
        #[from]
        source: CipherError,
    },

    #[error("connection closed by the server")]
    Closed,

    #[error("unexpected status {0}")]
    UnexpectedStatus(StatusCode),

    #[error("encrypted exchange before the handshake")]
    NoSession,
}

/// A response as read by [`Client`].
///
/// For chunked responses `chunks` holds every chunk payload and `body` their
/// concatenation. Encrypted payloads are already decrypted.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub line: StatusLine,
    pub headers: Headers,
    pub body: Bytes,
    pub chunks: Vec<Bytes>,
}

#[derive(Debug)]
pub struct Client<S> {
    framed: Framed<S, ResponseDecoder>,
    session: Option<SessionCipher>,
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { framed: Framed::with_capacity(stream, ResponseDecoder::new(), 8 * 1024), session: None }
    }

    /// The underlying stream; bytes already buffered by the client are not
    /// visible through it.
    pub fn get_mut(&mut self) -> &mut S {
        self.framed.get_mut()
    }

    pub fn session(&self) -> Option<&SessionCipher> {
        self.session.as_ref()
    }

    pub async fn send(&mut self, request: &Request) -> io::Result<()> {
        let mut raw = Vec::with_capacity(256 + request.body.len());
        request.serialize(&mut raw);
        self.send_raw(&raw).await
    }

    pub async fn send_raw(&mut self, raw: &[u8]) -> io::Result<()> {
        let stream = self.framed.get_mut();
        stream.write_all(raw).await?;
        stream.flush().await
    }

    pub async fn round_trip(&mut self, request: &Request) -> Result<ClientResponse, ClientError> {
        self.send(request).await?;
        self.read_response(request.method() == Method::HEAD).await
    }

    /// Runs the `request` and `AES-KEY` steps and keeps the session.
    pub async fn handshake(&mut self) -> Result<(), ClientError> {
        let response = self.round_trip(&handshake_request(EncryptionOp::Request, Bytes::new())).await?;
        expect_ok(&response)?;
        let public_key = PublicKey::from_pem(&String::from_utf8_lossy(&response.body))?;

        let session = SessionCipher::generate()?;
        let sealed = public_key.seal_session_key(&session)?;
        let response = self.round_trip(&handshake_request(EncryptionOp::AesKey, Bytes::from(sealed))).await?;
        expect_ok(&response)?;

        self.session = Some(session);
        Ok(())
    }

    /// Sends `request` with its body encrypted and decrypts the response.
    pub async fn encrypted_round_trip(&mut self, mut request: Request) -> Result<ClientResponse, ClientError> {
        let session = self.session.clone().ok_or(ClientError::NoSession)?;
        request.headers.set(ENCRYPTION_HEADER, AES_TRANSFER);
        if !request.body.is_empty() {
            request.body = session.encrypt(&request.body)?.into();
            request.headers.set("Content-Length", request.body.len().to_string());
        }
        self.round_trip(&request).await
    }

    /// Reads the next response; `head_only` for answers to `HEAD`.
    pub async fn read_response(&mut self, head_only: bool) -> Result<ClientResponse, ClientError> {
        self.framed.codec_mut().set_head_only(head_only);
        let ReceivedResponse { head, body, mut chunks } = match self.framed.next().await {
            Some(response) => response?,
            None => return Err(ClientError::Closed),
        };

        let mut body = BytesMut::from(&body[..]);
        let encrypted = head.headers.get(ENCRYPTION_HEADER).is_some_and(|value| value.eq_ignore_ascii_case(AES_TRANSFER));
        if let (true, Some(session)) = (encrypted, &self.session) {
            if !body.is_empty() {
                body = BytesMut::from(&session.decrypt(&body)?[..]);
            }
            for chunk in &mut chunks {
                *chunk = session.decrypt(chunk)?.into();
            }
        }
        for chunk in &chunks {
            body.extend_from_slice(chunk);
        }

        Ok(ClientResponse { line: head.line, headers: head.headers, body: body.freeze(), chunks })
    }

    /// True when the server closed the connection without sending more bytes.
    pub async fn is_closed(&mut self) -> bool {
        self.framed.read_buffer().is_empty() && self.framed.next().await.is_none()
    }
}

fn handshake_request(op: EncryptionOp, body: Bytes) -> Request {
    let mut headers = Headers::new();
    headers.set(ENCRYPTION_HEADER, op.as_str());
    headers.set("Content-Length", body.len().to_string());
    Request::new(RequestLine::new(Method::POST, "/", Version::HTTP_11), headers, body)
}

fn expect_ok(response: &ClientResponse) -> Result<(), ClientError> {
    if response.line.status == StatusCode::OK {
        Ok(())
    } else {
        Err(ClientError::UnexpectedStatus(response.line.status))
    }
}
