use std::fmt;

use aws_lc_rs::cipher::{
    AES_128, DecryptionContext, EncryptionContext, PaddedBlockDecryptingKey, PaddedBlockEncryptingKey,
    UnboundCipherKey,
};
use aws_lc_rs::iv::FixedLength;

use crate::secure::CipherError;

pub const AES_KEY_LEN: usize = 16;
pub const AES_IV_LEN: usize = 16;

/// AES-128-CBC with PKCS#7 padding under a fixed key and IV.
///
/// Every message, whether a full body or a single chunk, is encrypted on its
/// own starting from the same IV.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCipher {
    key: [u8; AES_KEY_LEN],
    iv: [u8; AES_IV_LEN],
}

impl SessionCipher {
    pub fn new(key: [u8; AES_KEY_LEN], iv: [u8; AES_IV_LEN]) -> Self {
        Self { key, iv }
    }

    /// Fresh random key and IV, as a client picks them.
    pub fn generate() -> Result<Self, CipherError> {
        let mut key = [0u8; AES_KEY_LEN];
        let mut iv = [0u8; AES_IV_LEN];
        aws_lc_rs::rand::fill(&mut key).map_err(CipherError::crypto("random key"))?;
        aws_lc_rs::rand::fill(&mut iv).map_err(CipherError::crypto("random iv"))?;
        Ok(Self { key, iv })
    }

    /// Splits `key || iv` as transported during the handshake.
    pub fn from_key_material(material: &[u8]) -> Result<Self, CipherError> {
        let (Ok(key), Ok(iv)) = (
            <[u8; AES_KEY_LEN]>::try_from(material.get(..AES_KEY_LEN).unwrap_or_default()),
            <[u8; AES_IV_LEN]>::try_from(material.get(AES_KEY_LEN..).unwrap_or_default()),
        ) else {
            return Err(CipherError::InvalidKeyMaterial(material.len()));
        };
        Ok(Self { key, iv })
    }

    pub fn key_material(&self) -> [u8; AES_KEY_LEN + AES_IV_LEN] {
        let mut material = [0u8; AES_KEY_LEN + AES_IV_LEN];
        material[..AES_KEY_LEN].copy_from_slice(&self.key);
        material[AES_KEY_LEN..].copy_from_slice(&self.iv);
        material
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let key = UnboundCipherKey::new(&AES_128, &self.key).map_err(CipherError::crypto("aes key"))?;
        let key = PaddedBlockEncryptingKey::cbc_pkcs7(key).map_err(CipherError::crypto("aes key"))?;

        let mut in_out = plaintext.to_vec();
        key.less_safe_encrypt(&mut in_out, EncryptionContext::Iv128(FixedLength::from(self.iv)))
            .map_err(CipherError::crypto("aes encrypt"))?;
        Ok(in_out)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let key = UnboundCipherKey::new(&AES_128, &self.key).map_err(CipherError::crypto("aes key"))?;
        let key = PaddedBlockDecryptingKey::cbc_pkcs7(key).map_err(CipherError::crypto("aes key"))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext_len = key
            .decrypt(&mut in_out, DecryptionContext::Iv128(FixedLength::from(self.iv)))
            .map_err(CipherError::crypto("aes decrypt"))?
            .len();
        in_out.truncate(plaintext_len);
        Ok(in_out)
    }
}

impl fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt() {
        let cipher = SessionCipher::generate().unwrap();
        let sealed = cipher.encrypt(b"the quick brown fox").unwrap();

        assert_eq!(sealed.len(), 32);
        assert_eq!(cipher.decrypt(&sealed).unwrap(), b"the quick brown fox");
    }

    #[test]
    fn empty_plaintext_is_one_padding_block() {
        let cipher = SessionCipher::new([7; 16], [9; 16]);
        let sealed = cipher.encrypt(b"").unwrap();

        assert_eq!(sealed.len(), 16);
        assert!(cipher.decrypt(&sealed).unwrap().is_empty());
    }

    #[test]
    fn same_iv_for_every_message() {
        let cipher = SessionCipher::new([1; 16], [2; 16]);
        assert_eq!(cipher.encrypt(b"chunk").unwrap(), cipher.encrypt(b"chunk").unwrap());
    }

    #[test]
    fn key_material_layout() {
        let cipher = SessionCipher::new([1; 16], [2; 16]);
        let material = cipher.key_material();
        assert_eq!(&material[..16], &[1; 16]);
        assert_eq!(&material[16..], &[2; 16]);
        assert_eq!(SessionCipher::from_key_material(&material).unwrap(), cipher);
    }

    #[test]
    fn key_material_must_be_32_bytes() {
        assert!(matches!(SessionCipher::from_key_material(&[0; 31]), Err(CipherError::InvalidKeyMaterial(31))));
        assert!(matches!(SessionCipher::from_key_material(&[0; 33]), Err(CipherError::InvalidKeyMaterial(33))));
    }

    #[test]
    fn garbage_does_not_decrypt() {
        let cipher = SessionCipher::new([1; 16], [2; 16]);
        assert!(cipher.decrypt(b"not a multiple of the block").is_err());
    }
}
