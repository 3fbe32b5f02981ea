use tracing::{debug, warn};

use crate::protocol::{HandlerError, StatusError};
use crate::secure::{KeyPair, SessionCipher};

/// Observable progress of a [`Handshake`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    Uninitialized,
    KeyIssued,
    SessionReady,
}

#[derive(Debug)]
enum State {
    Uninitialized,
    KeyIssued(KeyPair),
    SessionReady(SessionCipher),
}

/// Per-connection handshake: `Uninitialized -> KeyIssued -> SessionReady`.
///
/// Steps arriving out of order fail with 400 and leave the state untouched.
/// Once the session is ready it never changes again, and the private key is
/// gone.
#[derive(Debug)]
pub struct Handshake {
    state: State,
    rsa_key_bits: usize,
}

impl Handshake {
    pub fn new(rsa_key_bits: usize) -> Self {
        Self { state: State::Uninitialized, rsa_key_bits }
    }

    pub fn phase(&self) -> HandshakePhase {
        match self.state {
            State::Uninitialized => HandshakePhase::Uninitialized,
            State::KeyIssued(_) => HandshakePhase::KeyIssued,
            State::SessionReady(_) => HandshakePhase::SessionReady,
        }
    }

    /// Step one: generates the connection keypair and returns its public PEM.
    pub async fn issue_public_key(&mut self) -> Result<String, HandlerError> {
        if !matches!(self.state, State::Uninitialized) {
            warn!(phase = ?self.phase(), "public key requested out of order");
            return Err(StatusError::bad_request().into());
        }

        let pair = KeyPair::generate_blocking(self.rsa_key_bits).await.map_err(HandlerError::other)?;
        let pem = pair.public_pem().to_owned();
        self.state = State::KeyIssued(pair);
        debug!("public key issued");
        Ok(pem)
    }

    /// Step two: opens the sealed `key || iv` and makes the session ready.
    pub fn accept_session_key(&mut self, sealed: &[u8]) -> Result<(), HandlerError> {
        let State::KeyIssued(pair) = &self.state else {
            warn!(phase = ?self.phase(), "session key sent out of order");
            return Err(StatusError::bad_request().into());
        };

        let session = pair.open_session_key(sealed).map_err(|e| {
            warn!(cause = %e, "unable to open session key");
            StatusError::bad_request()
        })?;
        self.state = State::SessionReady(session);
        debug!("session ready");
        Ok(())
    }

    /// The negotiated cipher; 400 until step two succeeded.
    pub fn session(&self) -> Result<&SessionCipher, StatusError> {
        match &self.state {
            State::SessionReady(session) => Ok(session),
            _ => Err(StatusError::bad_request()),
        }
    }
}
