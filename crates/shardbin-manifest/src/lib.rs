//! shardbin-manifest: content descriptor + authenticated manifest framing
//!
//! Manifest layout (all integers little-endian):
//! ```text
//! offset size  field
//! 0      4     magic       86 90 99 8B
//! 4      4     version     1
//! 8      42    crypto parameters (kdf, cipher, salt, nonce)
//! 50     N     AEAD ciphertext || 16-byte tag
//! ```
//!
//! The AEAD's associated data is the literal 50-byte prefix, so the header
//! and parameters are plaintext but tamper-evident. The sealed payload is
//! the JSON content descriptor defined in [`content`].

pub mod codec;
pub mod content;

pub use codec::{decode, encode, ManifestError, MAGIC, PREFIX_SIZE, VERSION_1};
pub use content::{Chunk, ChunkCopy, Content, Meta};
