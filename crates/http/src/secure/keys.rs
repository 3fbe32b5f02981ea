//! RSA halves of the handshake.
//!
//! The server side ([`KeyPair`]) generates a keypair per connection, hands out
//! the public half as PEM and opens the session key sealed with it. The client
//! side ([`PublicKey`]) imports that PEM and seals a [`SessionCipher`].

use std::fmt;

use aws_lc_rs::encoding::{AsDer, PublicKeyX509Der};
use aws_lc_rs::rsa::{
    KeySize, OAEP_SHA1_MGF1SHA1, OaepPrivateDecryptingKey, OaepPublicEncryptingKey, PrivateDecryptingKey,
    PublicEncryptingKey,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::secure::{CipherError, SessionCipher};

pub const DEFAULT_RSA_KEY_BITS: usize = 2048;

const PEM_BEGIN: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_END: &str = "-----END PUBLIC KEY-----";
const PEM_LINE_WIDTH: usize = 64;

fn key_size(bits: usize) -> Result<KeySize, CipherError> {
    match bits {
        2048 => Ok(KeySize::Rsa2048),
        3072 => Ok(KeySize::Rsa3072),
        4096 => Ok(KeySize::Rsa4096),
        8192 => Ok(KeySize::Rsa8192),
        other => Err(CipherError::UnsupportedKeySize(other)),
    }
}

/// Server-side RSA keypair; only the public half ever leaves the process.
pub struct KeyPair {
    private: OaepPrivateDecryptingKey,
    public_pem: String,
}

impl KeyPair {
    /// Generates a keypair. CPU heavy, callers on a runtime should use [`KeyPair::generate_blocking`].
    pub fn generate(bits: usize) -> Result<Self, CipherError> {
        let private = PrivateDecryptingKey::generate(key_size(bits)?).map_err(CipherError::crypto("rsa keygen"))?;
        let der: PublicKeyX509Der<'static> = private.public_key().as_der().map_err(CipherError::crypto("rsa export"))?;
        let public_pem = encode_pem(der.as_ref());
        let private = OaepPrivateDecryptingKey::new(private).map_err(CipherError::crypto("rsa oaep key"))?;
        Ok(Self { private, public_pem })
    }

    /// [`KeyPair::generate`] on tokio's blocking pool.
    pub async fn generate_blocking(bits: usize) -> Result<Self, CipherError> {
        tokio::task::spawn_blocking(move || Self::generate(bits))
            .await
            .map_err(|e| CipherError::KeyGeneration { reason: e.to_string() })?
    }

    /// The public key as a PEM encoded SubjectPublicKeyInfo.
    pub fn public_pem(&self) -> &str {
        &self.public_pem
    }

    /// Decrypts an OAEP sealed `key || iv` and builds the session cipher from it.
    pub fn open_session_key(&self, sealed: &[u8]) -> Result<SessionCipher, CipherError> {
        let mut plaintext = vec![0u8; self.private.min_output_size()];
        let material = self
            .private
            .decrypt(&OAEP_SHA1_MGF1SHA1, sealed, &mut plaintext, None)
            .map_err(CipherError::crypto("rsa decrypt"))?;
        SessionCipher::from_key_material(material)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("public_pem", &self.public_pem).finish_non_exhaustive()
    }
}

/// Client-side view of a server's public key.
pub struct PublicKey {
    inner: OaepPublicEncryptingKey,
}

impl PublicKey {
    pub fn from_pem(pem: &str) -> Result<Self, CipherError> {
        let body = pem
            .trim()
            .strip_prefix(PEM_BEGIN)
            .and_then(|rest| rest.trim_end().strip_suffix(PEM_END))
            .ok_or_else(|| CipherError::invalid_pem("missing PUBLIC KEY armor"))?;
        let encoded: String = body.split_whitespace().collect();
        let der = STANDARD.decode(encoded).map_err(CipherError::invalid_pem)?;

        let key = PublicEncryptingKey::from_der(&der)?;
        let inner = OaepPublicEncryptingKey::new(key).map_err(CipherError::crypto("rsa oaep key"))?;
        Ok(Self { inner })
    }

    /// Seals the session key material for the holder of the private key.
    pub fn seal_session_key(&self, session: &SessionCipher) -> Result<Vec<u8>, CipherError> {
        let mut ciphertext = vec![0u8; self.inner.ciphertext_size()];
        let len = self
            .inner
            .encrypt(&OAEP_SHA1_MGF1SHA1, &session.key_material(), &mut ciphertext, None)
            .map_err(CipherError::crypto("rsa encrypt"))?
            .len();
        ciphertext.truncate(len);
        Ok(ciphertext)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey").finish_non_exhaustive()
    }
}

fn encode_pem(der: &[u8]) -> String {
    let encoded = STANDARD.encode(der);
    let mut pem = String::with_capacity(encoded.len() + encoded.len() / PEM_LINE_WIDTH + 64);
    pem.push_str(PEM_BEGIN);
    pem.push('\n');
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(PEM_LINE_WIDTH));
        pem.push_str(line);
        pem.push('\n');
        rest = tail;
    }
    pem.push_str(PEM_END);
    pem.push('\n');
    pem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pem_armor() {
        let pair = KeyPair::generate(DEFAULT_RSA_KEY_BITS).unwrap();
        let pem = pair.public_pem();

        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----\n"));
        assert!(pem.ends_with("-----END PUBLIC KEY-----\n"));
        assert!(pem.lines().all(|line| line.len() <= 64));
    }

    #[test]
    fn sealed_session_key_opens() {
        let pair = KeyPair::generate(DEFAULT_RSA_KEY_BITS).unwrap();
        let client_key = PublicKey::from_pem(pair.public_pem()).unwrap();
        let session = SessionCipher::generate().unwrap();

        let sealed = client_key.seal_session_key(&session).unwrap();
        assert_eq!(sealed.len(), 256);
        assert_eq!(pair.open_session_key(&sealed).unwrap(), session);
    }

    #[test]
    fn unsupported_key_size() {
        assert!(matches!(KeyPair::generate(1000), Err(CipherError::UnsupportedKeySize(1000))));
    }

    #[test]
    fn rejects_bad_pem() {
        assert!(matches!(PublicKey::from_pem("hello"), Err(CipherError::InvalidPem { .. })));
        let not_base64 = format!("{PEM_BEGIN}\n!!!!\n{PEM_END}\n");
        assert!(matches!(PublicKey::from_pem(&not_base64), Err(CipherError::InvalidPem { .. })));
    }

    #[test]
    fn corrupted_ciphertext_is_rejected() {
        let pair = KeyPair::generate(DEFAULT_RSA_KEY_BITS).unwrap();
        assert!(pair.open_session_key(&[0u8; 256]).is_err());
    }
}
