use aws_lc_rs::error::{KeyRejected, Unspecified};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("{op} failed")]
    Crypto {
        op: &'static str,
        #[source]
        source: Unspecified,
    },

    #[error("public key rejected: {source}")]
    KeyRejected {
        #[from]
        source: KeyRejected,
    },

    #[error("unsupported rsa key size: {0} bits")]
    UnsupportedKeySize(usize),

    #[error("invalid pem: {reason}")]
    InvalidPem { reason: String },

    #[error("session key material must be 32 bytes, got {0}")]
    InvalidKeyMaterial(usize),

    #[error("key generation task failed: {reason}")]
    KeyGeneration { reason: String },
}

impl CipherError {
    /// Adapter for `map_err` on `aws-lc-rs` calls reporting [`Unspecified`].
    pub(crate) fn crypto(op: &'static str) -> impl FnOnce(Unspecified) -> Self {
        move |source| Self::Crypto { op, source }
    }

    pub fn invalid_pem<S: ToString>(str: S) -> Self {
        Self::InvalidPem { reason: str.to_string() }
    }
}
