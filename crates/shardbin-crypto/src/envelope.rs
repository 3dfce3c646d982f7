//! AEAD envelope: Argon2id key derivation + XChaCha20-Poly1305 seal/open

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::params::{Parameters, CIPHER_XCHACHA20_POLY1305, KDF_ARGON2ID};
use crate::KEY_SIZE;

/// Argon2id cost constants. These are part of the format: weakening them
/// changes the derived key and breaks every existing manifest.
const ARGON2_TIME_COST: u32 = 4;
const ARGON2_MEM_COST_KIB: u32 = 65536;
const ARGON2_PARALLELISM: u32 = 4;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("unsupported KDF identifier {0}")]
    UnsupportedKdf(u8),

    #[error("unsupported cipher identifier {0}")]
    UnsupportedCipher(u8),

    #[error("key derivation failed: {0}")]
    Kdf(String),

    #[error("authentication failed")]
    Auth,

    #[error("system RNG unavailable: {0}")]
    Rng(String),
}

/// A password-bound AEAD envelope holding the crypto parameters of one
/// upload. `encode`/`decode` derive the key on each call so the envelope
/// never keeps key material alive between operations.
pub struct Envelope {
    parameters: Parameters,
    password: SecretString,
}

impl Envelope {
    /// Create an envelope with freshly sampled salt and nonce.
    pub fn new(password: SecretString) -> Result<Self, EnvelopeError> {
        Ok(Self {
            parameters: Parameters::generate()?,
            password,
        })
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Replace the parameters with ones read from a manifest.
    ///
    /// The supported-identifier check runs against the *current*
    /// parameters, so an envelope constructed in a mode this build cannot
    /// honor refuses to accept replacements.
    pub fn set_parameters(&mut self, parameters: Parameters) -> Result<(), EnvelopeError> {
        if self.parameters.kdf != KDF_ARGON2ID {
            return Err(EnvelopeError::UnsupportedKdf(self.parameters.kdf));
        }
        if self.parameters.cipher != CIPHER_XCHACHA20_POLY1305 {
            return Err(EnvelopeError::UnsupportedCipher(self.parameters.cipher));
        }
        self.parameters = parameters;
        Ok(())
    }

    /// Seal `plaintext` under the envelope key. Returns ciphertext with the
    /// 16-byte Poly1305 tag appended.
    pub fn encode(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        let key = self.derive_key()?;
        let cipher = XChaCha20Poly1305::new((&*key).into());
        let nonce = XNonce::from_slice(&self.parameters.nonce);

        cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| EnvelopeError::Auth)
    }

    /// Open `ciphertext || tag`. Fails with [`EnvelopeError::Auth`] when the
    /// password, AAD, tag, or ciphertext do not match; no partial plaintext
    /// is ever returned.
    pub fn decode(&self, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        let key = self.derive_key()?;
        let cipher = XChaCha20Poly1305::new((&*key).into());
        let nonce = XNonce::from_slice(&self.parameters.nonce);

        cipher
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| EnvelopeError::Auth)
    }

    fn derive_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>, EnvelopeError> {
        let argon2_params = Params::new(
            ARGON2_MEM_COST_KIB,
            ARGON2_TIME_COST,
            ARGON2_PARALLELISM,
            Some(KEY_SIZE),
        )
        .map_err(|e| EnvelopeError::Kdf(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        argon2
            .hash_password_into(
                self.password.expose_secret().as_bytes(),
                &self.parameters.salt,
                &mut *key,
            )
            .map_err(|e| EnvelopeError::Kdf(e.to_string()))?;

        Ok(key)
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("parameters", &self.parameters)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NONCE_SIZE, SALT_SIZE, TAG_SIZE};

    fn test_envelope() -> Envelope {
        Envelope::new(SecretString::from("unit-test-password")).unwrap()
    }

    #[test]
    fn new_generates_parameters() {
        let envelope = test_envelope();
        let params = envelope.parameters();

        assert_eq!(params.kdf, KDF_ARGON2ID);
        assert_eq!(params.cipher, CIPHER_XCHACHA20_POLY1305);
        assert_ne!(params.salt, [0u8; SALT_SIZE]);
        assert_ne!(params.nonce, [0u8; NONCE_SIZE]);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let envelope = test_envelope();
        let plaintext = b"hello, dispersed world!";
        let aad = b"chunk-hash-stand-in";

        let sealed = envelope.encode(plaintext, aad).unwrap();
        assert_eq!(sealed.len(), plaintext.len() + TAG_SIZE);

        let opened = envelope.decode(&sealed, aad).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn decode_wrong_password_fails() {
        let envelope = test_envelope();
        let sealed = envelope.encode(b"secret", b"aad").unwrap();

        let mut other = Envelope::new(SecretString::from("wrong-password")).unwrap();
        other.set_parameters(*envelope.parameters()).unwrap();

        assert!(matches!(
            other.decode(&sealed, b"aad"),
            Err(EnvelopeError::Auth)
        ));
    }

    #[test]
    fn decode_wrong_aad_fails() {
        let envelope = test_envelope();
        let sealed = envelope.encode(b"secret", b"aad-a").unwrap();

        assert!(envelope.decode(&sealed, b"aad-b").is_err());
    }

    #[test]
    fn decode_tampered_ciphertext_fails() {
        let envelope = test_envelope();
        let mut sealed = envelope.encode(b"secret data", b"aad").unwrap();
        sealed[0] ^= 0xff;

        assert!(envelope.decode(&sealed, b"aad").is_err());
    }

    #[test]
    fn decode_tampered_tag_fails() {
        let envelope = test_envelope();
        let mut sealed = envelope.encode(b"secret data", b"aad").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;

        assert!(envelope.decode(&sealed, b"aad").is_err());
    }

    #[test]
    fn set_parameters_replaces() {
        let mut envelope = test_envelope();
        let replacement = Parameters {
            kdf: KDF_ARGON2ID,
            cipher: CIPHER_XCHACHA20_POLY1305,
            salt: [1u8; SALT_SIZE],
            nonce: [2u8; NONCE_SIZE],
        };

        envelope.set_parameters(replacement).unwrap();
        assert_eq!(envelope.parameters(), &replacement);
    }

    #[test]
    fn set_parameters_rejects_unsupported_kdf() {
        let mut envelope = test_envelope();
        envelope.parameters.kdf = 99;

        let replacement = *test_envelope().parameters();
        assert!(matches!(
            envelope.set_parameters(replacement),
            Err(EnvelopeError::UnsupportedKdf(99))
        ));
    }

    #[test]
    fn set_parameters_rejects_unsupported_cipher() {
        let mut envelope = test_envelope();
        envelope.parameters.cipher = 7;

        let replacement = *test_envelope().parameters();
        assert!(matches!(
            envelope.set_parameters(replacement),
            Err(EnvelopeError::UnsupportedCipher(7))
        ));
    }

    #[test]
    fn same_parameters_same_ciphertext() {
        // The envelope is deterministic by design: fixed salt, nonce, and
        // password must reproduce identical sealed bytes.
        let envelope = test_envelope();
        let a = envelope.encode(b"payload", b"aad").unwrap();
        let b = envelope.encode(b"payload", b"aad").unwrap();
        assert_eq!(a, b);
    }
}
