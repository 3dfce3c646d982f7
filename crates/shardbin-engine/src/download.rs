//! Download path: manifest recovery, per-chunk copy failover, reassembly

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use shardbin_core::Mode;
use shardbin_crypto::Envelope;
use shardbin_manifest::{Chunk, Content, Meta};

use crate::{file_sha256, Engine, EngineError, ProgressFn};

/// What a download produced.
#[derive(Debug)]
pub struct DownloadReport {
    pub output: PathBuf,
    pub bytes: i64,
    pub chunks: u64,
}

impl Engine {
    /// Run the configured download. Per-copy failures rotate to the next
    /// copy; everything else aborts. The reassembled file is re-hashed and
    /// checked against the manifest before the report is returned.
    ///
    /// The output file is created (and truncated) as soon as the manifest
    /// opens; a caller that cancels or hits an error mid-transfer owns the
    /// cleanup of the partial file.
    pub async fn download(
        &self,
        progress: Option<&ProgressFn>,
    ) -> Result<DownloadReport, EngineError> {
        let download_cfg = match &self.config.mode {
            Mode::Download(cfg) => cfg,
            _ => return Err(EngineError::WrongMode("download")),
        };

        let manifest_bytes = self.load_manifest_bytes().await?;

        // The fresh parameters are overwritten by the manifest's during
        // decode; afterwards the envelope opens the chunk ciphertexts too.
        let mut envelope = Envelope::new(self.config.password.clone())?;
        let content_bytes = shardbin_manifest::decode(&mut &manifest_bytes[..], &mut envelope)?;
        let content =
            Content::decode(&content_bytes).map_err(shardbin_manifest::ManifestError::from)?;

        debug!(
            output = %download_cfg.output.display(),
            chunks = content.chunks.len(),
            bytes = content.size,
            "download starting"
        );

        let mut output = tokio::fs::File::create(&download_cfg.output).await?;
        let total = content.chunks.len() as u64;

        for (i, chunk) in content.chunks.iter().enumerate() {
            let plaintext = self.recover_chunk(chunk, &envelope).await?;
            output.write_all(&plaintext).await?;

            if let Some(cb) = progress {
                cb(i as u64 + 1, total, &format!("chunk {}/{}", i + 1, total));
            }
        }

        output.flush().await?;
        drop(output);

        let output_hash = file_sha256(&download_cfg.output).await?;
        if output_hash != content.hash {
            return Err(EngineError::OutputFileHashMismatch);
        }

        info!(
            output = %download_cfg.output.display(),
            bytes = content.size,
            chunks = total,
            "download complete"
        );

        Ok(DownloadReport {
            output: download_cfg.output.clone(),
            bytes: content.size,
            chunks: total,
        })
    }

    /// Try each stored copy of a chunk in order until one downloads,
    /// authenticates, and hashes correctly. Only the last failure
    /// surfaces; earlier ones are logged and swallowed.
    async fn recover_chunk(
        &self,
        chunk: &Chunk,
        envelope: &Envelope,
    ) -> Result<Vec<u8>, EngineError> {
        let mut last_error = None;

        for copy in &chunk.copies {
            let provider = match self.provider_by_name(&copy.provider) {
                Some(p) => p,
                None => {
                    warn!(chunk = chunk.id, provider = %copy.provider, "copy names unknown provider");
                    last_error = Some(EngineError::UnknownProvider(copy.provider.clone()));
                    continue;
                }
            };

            let ciphertext = match provider.download(&copy.meta).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(chunk = chunk.id, provider = %copy.provider, error = %e, "copy download failed");
                    last_error = Some(EngineError::Provider {
                        name: copy.provider.clone(),
                        source: e,
                    });
                    continue;
                }
            };

            let plaintext = match envelope.decode(&ciphertext, &chunk.hash) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(chunk = chunk.id, provider = %copy.provider, "copy failed authentication");
                    last_error = Some(EngineError::Crypto(e));
                    continue;
                }
            };

            let plaintext_hash: [u8; 32] = Sha256::digest(&plaintext).into();
            if plaintext_hash != chunk.hash {
                warn!(chunk = chunk.id, provider = %copy.provider, "copy hash mismatch");
                last_error = Some(EngineError::ChunkHashMismatch { id: chunk.id });
                continue;
            }

            return Ok(plaintext);
        }

        Err(last_error.unwrap_or(EngineError::ChunkUnrecoverable(chunk.id)))
    }

    /// Locate the manifest bytes: a provider token or a filesystem path,
    /// then an optional ghost unwrap.
    pub(crate) async fn load_manifest_bytes(&self) -> Result<Vec<u8>, EngineError> {
        let raw = if self.config.manifest.starts_with("provider:") {
            self.manifest_from_provider().await?
        } else {
            tokio::fs::read(&self.config.manifest).await?
        };

        match self.config.ghost_mode {
            Some(mode) => Ok(mode.decode(&raw)?),
            None => Ok(raw),
        }
    }

    /// Resolve a `provider:<name>:<base64 meta>` token.
    async fn manifest_from_provider(&self) -> Result<Vec<u8>, EngineError> {
        let token = &self.config.manifest;
        let parts: Vec<&str> = token.splitn(3, ':').collect();
        if parts.len() < 3 {
            return Err(EngineError::InvalidManifestToken(token.clone()));
        }

        let provider = self
            .provider_by_name(parts[1])
            .ok_or_else(|| EngineError::UnknownProvider(parts[1].to_string()))?;

        let meta_bytes = BASE64
            .decode(parts[2])
            .map_err(|_| EngineError::InvalidManifestToken(token.clone()))?;
        let meta: Meta = serde_json::from_slice(&meta_bytes)
            .map_err(|_| EngineError::InvalidManifestToken(token.clone()))?;

        provider
            .download(&meta)
            .await
            .map_err(|e| EngineError::Provider {
                name: parts[1].to_string(),
                source: e,
            })
    }
}
