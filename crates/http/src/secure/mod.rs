//! Application-layer encryption negotiated over plain HTTP.
//!
//! A client drives the handshake with the `MyEncryption` request header:
//!
//! 1. `request`: the server generates an RSA keypair for the connection and
//!    answers with the public key as PEM, marked `public-key-response`.
//! 2. `AES-KEY`: the body is the RSA-OAEP sealed 16-byte AES key followed by
//!    the 16-byte IV. The server answers with an empty body marked
//!    `AES-KEY-ACK`.
//! 3. `aes-transfer`: request and response bodies, and each chunk of a
//!    chunked response, are AES-128-CBC encrypted with the session key.
//!
//! Header names and values compare case-insensitively. Out of order or
//! unknown operations fail with 400.

mod error;
mod handshake;
mod keys;
mod session;

pub use error::CipherError;
pub use handshake::{Handshake, HandshakePhase};
pub use keys::{DEFAULT_RSA_KEY_BITS, KeyPair, PublicKey};
pub use session::SessionCipher;

use crate::protocol::StatusError;

/// Request and response header carrying the encryption operation.
pub const ENCRYPTION_HEADER: &str = "MyEncryption";

/// Response marker for step one.
pub const PUBLIC_KEY_RESPONSE: &str = "public-key-response";

/// Response marker for step two.
pub const AES_KEY_ACK: &str = "AES-KEY-ACK";

/// Request and response marker for encrypted traffic.
pub const AES_TRANSFER: &str = "aes-transfer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionOp {
    Request,
    AesKey,
    AesTransfer,
}

impl EncryptionOp {
    /// Parses the header value; anything unknown is a 400.
    pub fn parse(value: &str) -> Result<Self, StatusError> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("request") {
            Ok(Self::Request)
        } else if value.eq_ignore_ascii_case("AES-KEY") {
            Ok(Self::AesKey)
        } else if value.eq_ignore_ascii_case(AES_TRANSFER) {
            Ok(Self::AesTransfer)
        } else {
            Err(StatusError::bad_request().with_reason(format!("Unknown Encryption Op {value}")))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::AesKey => "AES-KEY",
            Self::AesTransfer => AES_TRANSFER,
        }
    }
}
