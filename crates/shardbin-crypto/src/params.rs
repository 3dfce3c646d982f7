//! The 42-byte crypto parameter record carried in every manifest
//!
//! ```text
//! offset size  field
//! 0      1     kdf     (1 = Argon2id)
//! 1      1     cipher  (1 = XChaCha20-Poly1305)
//! 2      16    salt
//! 18     24    nonce
//! ```
//!
//! The layout is packed by hand so the bytes are identical across
//! implementations; no struct-serialization framework is involved.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::envelope::EnvelopeError;
use crate::{NONCE_SIZE, SALT_SIZE};

/// KDF identifier for Argon2id.
pub const KDF_ARGON2ID: u8 = 1;

/// Cipher identifier for XChaCha20-Poly1305.
pub const CIPHER_XCHACHA20_POLY1305: u8 = 1;

/// Encoded size of [`Parameters`] in bytes.
pub const PARAMS_SIZE: usize = 2 + SALT_SIZE + NONCE_SIZE;

/// Crypto parameters fixed at upload time and persisted in the manifest
/// header. Immutable once sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    pub kdf: u8,
    pub cipher: u8,
    pub salt: [u8; SALT_SIZE],
    pub nonce: [u8; NONCE_SIZE],
}

impl Parameters {
    /// Sample fresh parameters from the OS CSPRNG.
    pub fn generate() -> Result<Self, EnvelopeError> {
        let mut salt = [0u8; SALT_SIZE];
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| EnvelopeError::Rng(e.to_string()))?;
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| EnvelopeError::Rng(e.to_string()))?;

        Ok(Self {
            kdf: KDF_ARGON2ID,
            cipher: CIPHER_XCHACHA20_POLY1305,
            salt,
            nonce,
        })
    }

    /// Pack into the fixed 42-byte wire form.
    pub fn to_bytes(&self) -> [u8; PARAMS_SIZE] {
        let mut out = [0u8; PARAMS_SIZE];
        out[0] = self.kdf;
        out[1] = self.cipher;
        out[2..2 + SALT_SIZE].copy_from_slice(&self.salt);
        out[2 + SALT_SIZE..].copy_from_slice(&self.nonce);
        out
    }

    /// Unpack from the fixed 42-byte wire form.
    pub fn from_bytes(bytes: &[u8; PARAMS_SIZE]) -> Self {
        let mut salt = [0u8; SALT_SIZE];
        let mut nonce = [0u8; NONCE_SIZE];
        salt.copy_from_slice(&bytes[2..2 + SALT_SIZE]);
        nonce.copy_from_slice(&bytes[2 + SALT_SIZE..]);

        Self {
            kdf: bytes[0],
            cipher: bytes[1],
            salt,
            nonce,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_fills_salt_and_nonce() {
        let params = Parameters::generate().unwrap();

        assert_eq!(params.kdf, KDF_ARGON2ID);
        assert_eq!(params.cipher, CIPHER_XCHACHA20_POLY1305);
        assert_ne!(params.salt, [0u8; SALT_SIZE], "salt must not be all zeros");
        assert_ne!(
            params.nonce, [0u8; NONCE_SIZE],
            "nonce must not be all zeros"
        );
    }

    #[test]
    fn wire_form_roundtrip() {
        let params = Parameters {
            kdf: KDF_ARGON2ID,
            cipher: CIPHER_XCHACHA20_POLY1305,
            salt: [7u8; SALT_SIZE],
            nonce: [9u8; NONCE_SIZE],
        };

        let bytes = params.to_bytes();
        assert_eq!(bytes.len(), 42);
        assert_eq!(Parameters::from_bytes(&bytes), params);
    }

    #[test]
    fn wire_form_layout() {
        let mut salt = [0u8; SALT_SIZE];
        let mut nonce = [0u8; NONCE_SIZE];
        for (i, b) in salt.iter_mut().enumerate() {
            *b = i as u8;
        }
        for (i, b) in nonce.iter_mut().enumerate() {
            *b = 0x80 + i as u8;
        }

        let bytes = Parameters {
            kdf: KDF_ARGON2ID,
            cipher: CIPHER_XCHACHA20_POLY1305,
            salt,
            nonce,
        }
        .to_bytes();

        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[1], 1);
        assert_eq!(&bytes[2..18], &salt);
        assert_eq!(&bytes[18..42], &nonce);
    }
}
