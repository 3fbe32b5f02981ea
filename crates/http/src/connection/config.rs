use crate::codec::{DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_HEADER_BYTES};
use crate::secure::DEFAULT_RSA_KEY_BITS;

/// Default size of one socket read
pub const DEFAULT_READ_BUFFER_CAPACITY: usize = 8 * 1024;

/// Per-connection limits and policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Limit for the request line plus header block, in bytes
    pub max_header_bytes: usize,
    /// Limit for an assembled request body, in bytes
    pub max_body_bytes: usize,
    /// Capacity of a single read from the socket
    pub read_buffer_capacity: usize,
    /// Modulus size of the per-connection RSA keypair
    pub rsa_key_bits: usize,
    /// Reject requests not carrying the encryption header
    pub require_encryption: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            rsa_key_bits: DEFAULT_RSA_KEY_BITS,
            require_encryption: false,
        }
    }
}

impl ConnectionConfig {
    #[must_use]
    pub fn max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.max_header_bytes = max_header_bytes;
        self
    }

    #[must_use]
    pub fn max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    #[must_use]
    pub fn read_buffer_capacity(mut self, read_buffer_capacity: usize) -> Self {
        self.read_buffer_capacity = read_buffer_capacity;
        self
    }

    #[must_use]
    pub fn rsa_key_bits(mut self, rsa_key_bits: usize) -> Self {
        self.rsa_key_bits = rsa_key_bits;
        self
    }

    #[must_use]
    pub fn require_encryption(mut self, require_encryption: bool) -> Self {
        self.require_encryption = require_encryption;
        self
    }
}
