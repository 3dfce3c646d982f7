//! shardbin-crypto: password-derived AEAD envelope
//!
//! One envelope is created per upload and sealed around every chunk plus
//! the manifest payload:
//!
//! ```text
//! key   = Argon2id(password, salt, t=4, m=64 MiB, p=4) → 256 bit
//! chunk = XChaCha20-Poly1305(key, nonce, plaintext, AAD = chunk SHA-256)
//! body  = XChaCha20-Poly1305(key, nonce, descriptor, AAD = 50-byte manifest prefix)
//! ```
//!
//! Salt and nonce live in the plaintext parameter block of the manifest;
//! the same pair is reused for every sealed payload of an upload (a v1
//! format constraint — the payloads are disambiguated by their AADs).

pub mod envelope;
pub mod params;

pub use envelope::{Envelope, EnvelopeError};
pub use params::{Parameters, CIPHER_XCHACHA20_POLY1305, KDF_ARGON2ID, PARAMS_SIZE};

/// Size of the derived encryption key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the Argon2id salt
pub const SALT_SIZE: usize = 16;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;
