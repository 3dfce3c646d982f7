//! Upload path: chunk, seal, disperse, and persist the manifest

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use shardbin_core::{Mode, UploadConfig};
use shardbin_crypto::Envelope;
use shardbin_manifest::Content;

use crate::{file_sha256, Engine, EngineError, ProgressFn};

/// What an upload produced.
#[derive(Debug)]
pub struct UploadReport {
    /// Where the manifest went: a filesystem path, or the shareable
    /// `provider:<name>:<base64 meta>` token.
    pub manifest_location: String,
    pub file_size: i64,
    pub chunks: u64,
    pub copies: usize,
    /// Shortest advertised retention across the provider set.
    pub expires: Option<Duration>,
}

impl Engine {
    /// Run the configured upload. Fails fast on sizing and replication
    /// constraints before the first byte leaves the machine.
    pub async fn upload(&self, progress: Option<&ProgressFn>) -> Result<UploadReport, EngineError> {
        let upload_cfg = match &self.config.mode {
            Mode::Upload(cfg) => cfg,
            _ => return Err(EngineError::WrongMode("upload")),
        };

        let file_size = tokio::fs::metadata(&upload_cfg.input).await?.len() as i64;
        let (chunk_size, n_chunks) = chunk_layout(file_size, upload_cfg);

        let limit = self.min_max_size();
        if chunk_size > limit {
            return Err(EngineError::ChunkSizeExceedsProviderLimit { chunk_size, limit });
        }

        let envelope = Envelope::new(self.config.password.clone())?;

        debug!(
            input = %upload_cfg.input.display(),
            file_size,
            chunk_size,
            n_chunks,
            copies = upload_cfg.copies,
            "upload starting"
        );

        let content = self
            .disperse_chunks(upload_cfg, &envelope, file_size, chunk_size, n_chunks, progress)
            .await?;

        let content_bytes = content.encode().map_err(shardbin_manifest::ManifestError::from)?;
        let mut manifest_bytes = Vec::new();
        shardbin_manifest::encode(&mut manifest_bytes, &envelope, &content_bytes)?;

        let manifest_location = self.persist_manifest(&manifest_bytes).await?;

        info!(
            input = %upload_cfg.input.display(),
            manifest = %manifest_location,
            chunks = n_chunks,
            copies = upload_cfg.copies,
            bytes = file_size,
            "upload complete"
        );

        Ok(UploadReport {
            manifest_location,
            file_size,
            chunks: n_chunks as u64,
            copies: upload_cfg.copies,
            expires: self.min_expire(),
        })
    }

    /// Read the input in chunk-size steps; seal and replicate each chunk.
    async fn disperse_chunks(
        &self,
        upload_cfg: &UploadConfig,
        envelope: &Envelope,
        file_size: i64,
        chunk_size: i64,
        n_chunks: i64,
        progress: Option<&ProgressFn>,
    ) -> Result<Content, EngineError> {
        let file_hash = file_sha256(&upload_cfg.input).await?;
        let mut content = Content::new(file_hash, file_size);

        let mut input = tokio::fs::File::open(&upload_cfg.input).await?;
        let mut buffer = vec![0u8; chunk_size as usize];
        let total_units = n_chunks as u64 * upload_cfg.copies as u64;
        let mut done_units = 0u64;

        loop {
            let n = read_full(&mut input, &mut buffer).await?;
            if n == 0 {
                break;
            }
            let chunk_data = &buffer[..n];

            let chunk_hash: [u8; 32] = Sha256::digest(chunk_data).into();
            let ciphertext = envelope.encode(chunk_data, &chunk_hash)?;

            // The first copy mints the chunk ID; the rest accumulate onto it.
            let mut chunk_id = None;
            for provider in self.sample_providers(upload_cfg.copies) {
                let meta =
                    provider
                        .upload(&ciphertext)
                        .await
                        .map_err(|e| EngineError::Provider {
                            name: provider.name().to_string(),
                            source: e,
                        })?;

                let id = content.add(chunk_hash, n as i64, provider.name(), chunk_id, meta);
                chunk_id = Some(id);

                done_units += 1;
                if let Some(cb) = progress {
                    cb(
                        done_units,
                        total_units,
                        &format!("chunk {}/{}", id, n_chunks),
                    );
                }
            }
        }

        Ok(content)
    }

    /// Persist the (possibly ghost-wrapped) manifest bytes and return the
    /// location string callers share.
    async fn persist_manifest(&self, data: &[u8]) -> Result<String, EngineError> {
        let mut carrier = Vec::new();
        match self.config.ghost_mode {
            Some(mode) => mode.encode(&mut carrier, data)?,
            None => carrier.extend_from_slice(data),
        }

        if let Some(name) = self.config.manifest.strip_prefix("provider:") {
            let provider = self
                .provider_by_name(name)
                .ok_or_else(|| EngineError::UnknownProvider(name.to_string()))?;

            let meta = provider
                .upload(&carrier)
                .await
                .map_err(|e| EngineError::Provider {
                    name: name.to_string(),
                    source: e,
                })?;

            return Ok(format!(
                "provider:{}:{}",
                name,
                BASE64.encode(meta.get().as_bytes())
            ));
        }

        tokio::fs::write(&self.config.manifest, &carrier).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(
                &self.config.manifest,
                std::fs::Permissions::from_mode(0o644),
            )
            .await?;
        }

        Ok(self.config.manifest.clone())
    }
}

/// Chunk sizing: a chunk count translates to `file_size / chunks + 1`
/// bytes per chunk; otherwise the configured size is used verbatim.
fn chunk_layout(file_size: i64, cfg: &UploadConfig) -> (i64, i64) {
    let chunk_size = if cfg.chunks > 0 {
        file_size / cfg.chunks + 1
    } else {
        cfg.chunk_size
    };
    let n_chunks = (file_size + chunk_size - 1) / chunk_size;
    (chunk_size, n_chunks)
}

/// Fill `buf` from the reader, stopping early only at EOF.
async fn read_full(
    file: &mut tokio::fs::File,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn upload_cfg(chunk_size: i64, chunks: i64) -> UploadConfig {
        UploadConfig {
            input: PathBuf::from("f"),
            chunk_size,
            chunks,
            copies: 1,
        }
    }

    #[test]
    fn chunk_count_drives_size() {
        // 10 bytes over 3 chunks: size 4, lengths (4, 4, 2).
        let (size, count) = chunk_layout(10, &upload_cfg(0, 3));
        assert_eq!(size, 4);
        assert_eq!(count, 3);
    }

    #[test]
    fn explicit_chunk_size_is_used_verbatim() {
        let (size, count) = chunk_layout(100, &upload_cfg(30, 0));
        assert_eq!(size, 30);
        assert_eq!(count, 4); // 30 + 30 + 30 + 10
    }

    #[test]
    fn exact_division_has_no_tail_chunk() {
        let (size, count) = chunk_layout(90, &upload_cfg(30, 0));
        assert_eq!(size, 30);
        assert_eq!(count, 3);
    }

    #[test]
    fn single_byte_file_single_chunk() {
        let (size, count) = chunk_layout(1, &upload_cfg(0, 1));
        assert_eq!(size, 2);
        assert_eq!(count, 1);
    }

    #[test]
    fn empty_file_yields_no_chunks() {
        let (_, count) = chunk_layout(0, &upload_cfg(0, 3));
        assert_eq!(count, 0);
    }
}
