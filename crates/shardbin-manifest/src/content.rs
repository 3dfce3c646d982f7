//! In-memory description of a dispersed file: ordered chunks, each with
//! one or more provider copies

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};

/// Provider-defined storage metadata. Opaque JSON: the engine stores and
/// replays it without ever looking inside.
pub type Meta = Box<RawValue>;

/// One stored replica of a chunk at a named provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkCopy {
    pub provider: String,
    pub meta: Meta,
}

/// A contiguous byte range of the input file.
///
/// IDs are 1-based and assigned in append order; `hash` is the SHA-256 of
/// the chunk *plaintext*.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: u32,
    pub hash: [u8; 32],
    pub size: i64,
    pub copies: Vec<ChunkCopy>,
}

/// The content descriptor: the confidential payload of a manifest.
///
/// `hash` is the SHA-256 of the original plaintext file and is the
/// canonical identity checked after reassembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub hash: [u8; 32],
    pub size: i64,
    pub chunks: Vec<Chunk>,
}

impl Content {
    pub fn new(file_hash: [u8; 32], size: i64) -> Self {
        Self {
            hash: file_hash,
            size,
            chunks: Vec::new(),
        }
    }

    /// Record a chunk copy, creating the chunk on first sight.
    ///
    /// With `chunk_id = None` the next incremental ID is assigned. Passing
    /// an existing ID appends another copy to that chunk; the returned ID
    /// is fed back in by callers replicating the same chunk.
    pub fn add(
        &mut self,
        chunk_hash: [u8; 32],
        size: i64,
        provider: &str,
        chunk_id: Option<u32>,
        meta: Meta,
    ) -> u32 {
        let id = chunk_id.unwrap_or_else(|| self.next_chunk_id());

        if let Some(chunk) = self.chunks.iter_mut().find(|c| c.id == id) {
            chunk.copies.push(ChunkCopy {
                provider: provider.to_string(),
                meta,
            });
            return id;
        }

        self.chunks.push(Chunk {
            id,
            hash: chunk_hash,
            size,
            copies: vec![ChunkCopy {
                provider: provider.to_string(),
                meta,
            }],
        });
        id
    }

    /// Serialize to the JSON form sealed inside the manifest.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from the JSON form.
    pub fn decode(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// SHA-256 over the concatenated chunk hashes in order.
    pub fn compute_file_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for chunk in &self.chunks {
            hasher.update(chunk.hash);
        }
        hasher.finalize().into()
    }

    /// Whether the stored file hash equals [`Self::compute_file_hash`].
    ///
    /// Only meaningful for single-chunk content: the canonical hash covers
    /// the file bytes, not the chunk hash chain.
    pub fn verify_file_hash(&self) -> bool {
        self.compute_file_hash() == self.hash
    }

    fn next_chunk_id(&self) -> u32 {
        match self.chunks.last() {
            Some(chunk) => chunk.id + 1,
            None => 1,
        }
    }
}
