//! Info path: open a manifest and describe it without touching chunks

use tracing::debug;

use shardbin_crypto::{Envelope, Parameters};
use shardbin_manifest::Content;

use crate::{Engine, EngineError};

/// Everything the manifest reveals once opened: framing, crypto
/// parameters, and the content descriptor. Rendering is the caller's
/// concern.
#[derive(Debug)]
pub struct ManifestInfo {
    pub version: u32,
    pub parameters: Parameters,
    pub content: Content,
    /// Whether the chunk-hash chain reproduces the stored file hash.
    /// Informational: only single-chunk uploads can satisfy it.
    pub chunk_chain_matches: bool,
}

impl Engine {
    /// Open the configured manifest and report what is inside. Works in
    /// any mode; only the manifest location and password are consulted.
    pub async fn info(&self) -> Result<ManifestInfo, EngineError> {
        let manifest_bytes = self.load_manifest_bytes().await?;

        let mut envelope = Envelope::new(self.config.password.clone())?;
        let content_bytes = shardbin_manifest::decode(&mut &manifest_bytes[..], &mut envelope)?;
        let content =
            Content::decode(&content_bytes).map_err(shardbin_manifest::ManifestError::from)?;

        debug!(
            manifest = %self.config.manifest,
            chunks = content.chunks.len(),
            "manifest opened"
        );

        Ok(ManifestInfo {
            version: shardbin_manifest::VERSION_1,
            parameters: *envelope.parameters(),
            chunk_chain_matches: content.verify_file_hash(),
            content,
        })
    }
}
