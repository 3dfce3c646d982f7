//! Binary manifest framing: header validation + AEAD over the descriptor
//!
//! The 50-byte prefix (header + parameters) is packed by hand, byte for
//! byte, and doubles as the AEAD's associated data on both paths. Decode
//! re-serializes what it read so the AAD is guaranteed bit-identical to
//! the prefix of the file.

use std::io::{Read, Write};

use thiserror::Error;

use shardbin_crypto::{Envelope, EnvelopeError, Parameters, PARAMS_SIZE};

/// Manifest file magic.
pub const MAGIC: [u8; 4] = [0x86, 0x90, 0x99, 0x8b];

/// First (and current) manifest format version.
pub const VERSION_1: u32 = 1;

const HEADER_SIZE: usize = 8;

/// Size of the plaintext prefix: magic + version + crypto parameters.
pub const PREFIX_SIZE: usize = HEADER_SIZE + PARAMS_SIZE;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid magic")]
    InvalidMagic,

    #[error("unsupported version {0}")]
    UnsupportedVersion(u32),

    #[error("invalid crypto parameters: {0}")]
    InvalidCryptoParams(#[source] EnvelopeError),

    #[error("decrypt failed")]
    DecryptFailed(#[source] EnvelopeError),

    #[error("seal failed: {0}")]
    Seal(#[source] EnvelopeError),

    #[error("content codec: {0}")]
    Content(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn prefix_bytes(version: u32, parameters: &Parameters) -> [u8; PREFIX_SIZE] {
    let mut prefix = [0u8; PREFIX_SIZE];
    prefix[..4].copy_from_slice(&MAGIC);
    prefix[4..8].copy_from_slice(&version.to_le_bytes());
    prefix[8..].copy_from_slice(&parameters.to_bytes());
    prefix
}

/// Write a complete manifest: prefix, then the sealed content descriptor.
pub fn encode<W: Write>(
    w: &mut W,
    envelope: &Envelope,
    content: &[u8],
) -> Result<(), ManifestError> {
    let prefix = prefix_bytes(VERSION_1, envelope.parameters());

    let ciphertext = envelope
        .encode(content, &prefix)
        .map_err(ManifestError::Seal)?;

    w.write_all(&prefix)?;
    w.write_all(&ciphertext)?;
    Ok(())
}

/// Read and open a manifest, returning the content descriptor bytes.
///
/// Magic and version are validated before any cryptographic work. On
/// success the envelope has adopted the manifest's parameters, so the same
/// envelope opens the chunk ciphertexts afterwards.
pub fn decode<R: Read>(r: &mut R, envelope: &mut Envelope) -> Result<Vec<u8>, ManifestError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(ManifestError::InvalidMagic);
    }

    let mut version_bytes = [0u8; 4];
    r.read_exact(&mut version_bytes)?;
    let version = u32::from_le_bytes(version_bytes);
    if version != VERSION_1 {
        return Err(ManifestError::UnsupportedVersion(version));
    }

    let mut params_bytes = [0u8; PARAMS_SIZE];
    r.read_exact(&mut params_bytes)?;
    let parameters = Parameters::from_bytes(&params_bytes);

    envelope
        .set_parameters(parameters)
        .map_err(ManifestError::InvalidCryptoParams)?;

    let mut ciphertext = Vec::new();
    r.read_to_end(&mut ciphertext)?;

    let prefix = prefix_bytes(version, &parameters);
    envelope
        .decode(&ciphertext, &prefix)
        .map_err(ManifestError::DecryptFailed)
}
