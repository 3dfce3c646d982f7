//! shardbin-engine: the split–encrypt–disperse–reassemble core
//!
//! Upload: read the file chunk by chunk, seal each chunk under a fresh
//! password-derived envelope, replicate every sealed chunk onto distinct
//! randomly-drawn providers, then seal the resulting content descriptor
//! into an authenticated manifest.
//!
//! Download: recover the manifest (from disk, a provider token, or a ghost
//! carrier), open it, and rebuild the file chunk by chunk, rotating through
//! the stored copies of each chunk until one downloads, authenticates, and
//! hashes correctly.
//!
//! Everything runs strictly sequentially: chunks in file order, copies in
//! sampling order. The only suspension points are provider and file I/O.

mod download;
mod info;
mod upload;

pub use download::DownloadReport;
pub use info::ManifestInfo;
pub use upload::UploadReport;

use std::time::Duration;

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use thiserror::Error;

use shardbin_core::{Config, ConfigError, Mode};
use shardbin_crypto::EnvelopeError;
use shardbin_ghost::GhostError;
use shardbin_manifest::ManifestError;
use shardbin_providers::{Provider, ProviderError, DEFAULT_PROVIDERS};

/// Progress callback type (units_done, units_total, message)
pub type ProgressFn = Box<dyn Fn(u64, u64, &str) + Send + Sync>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("engine is not configured for {0}")]
    WrongMode(&'static str),

    #[error("unknown provider {0:?}")]
    UnknownProvider(String),

    #[error("chunk size of {chunk_size} bytes exceeds the smallest provider limit of {limit} bytes")]
    ChunkSizeExceedsProviderLimit { chunk_size: i64, limit: i64 },

    #[error("{copies} copies exceed the {providers} configured providers")]
    CopiesExceedProviders { copies: usize, providers: usize },

    #[error("output file hash does not match the manifest")]
    OutputFileHashMismatch,

    #[error("chunk {id} plaintext does not match its recorded hash")]
    ChunkHashMismatch { id: u32 },

    #[error("chunk {0} has no recoverable copy")]
    ChunkUnrecoverable(u32),

    #[error("invalid manifest token {0:?}")]
    InvalidManifestToken(String),

    #[error("provider {name}: {source}")]
    Provider {
        name: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("crypto: {0}")]
    Crypto(#[from] EnvelopeError),

    #[error("ghost carrier: {0}")]
    Ghost(#[from] GhostError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The engine: a validated configuration plus its provider set, both
/// read-only after construction.
pub struct Engine {
    config: Config,
    providers: Vec<Box<dyn Provider>>,
}

impl Engine {
    /// Build an engine, constructing providers from the configured names
    /// (or the default set when none are given).
    pub fn new(config: Config) -> Result<Self, EngineError> {
        config.validate()?;

        let names: Vec<String> = if config.providers.is_empty() {
            DEFAULT_PROVIDERS.iter().map(|s| s.to_string()).collect()
        } else {
            config.providers.clone()
        };

        let mut providers = Vec::with_capacity(names.len());
        for name in &names {
            let provider =
                shardbin_providers::build(name, &config.options).map_err(|e| match e {
                    ProviderError::UnknownProvider(name) => EngineError::UnknownProvider(name),
                    other => EngineError::Provider {
                        name: name.clone(),
                        source: other,
                    },
                })?;
            providers.push(provider);
        }

        Self::with_providers(config, providers)
    }

    /// Build an engine around an explicit provider set. Used by tests and
    /// by embedders wiring in their own backends.
    pub fn with_providers(
        config: Config,
        providers: Vec<Box<dyn Provider>>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        if let Mode::Upload(upload) = &config.mode {
            if upload.copies > providers.len() {
                return Err(EngineError::CopiesExceedProviders {
                    copies: upload.copies,
                    providers: providers.len(),
                });
            }
        }

        Ok(Self { config, providers })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Providers for one chunk's copies: the configured set shuffled with
    /// the OS CSPRNG, truncated to `copies`. Distinctness falls out of the
    /// shuffle, no rejection loop needed.
    fn sample_providers(&self, copies: usize) -> Vec<&dyn Provider> {
        let mut picks: Vec<&dyn Provider> = self.providers.iter().map(|p| p.as_ref()).collect();
        picks.shuffle(&mut OsRng);
        picks.truncate(copies);
        picks
    }

    fn provider_by_name(&self, name: &str) -> Option<&dyn Provider> {
        self.providers
            .iter()
            .map(|p| p.as_ref())
            .find(|p| p.name() == name)
    }

    /// The most restrictive max-size across the configured providers.
    fn min_max_size(&self) -> i64 {
        self.providers
            .iter()
            .map(|p| p.max_size())
            .min()
            .unwrap_or(0)
    }

    /// The shortest known retention across the configured providers;
    /// `None` when no provider advertises one.
    pub fn min_expire(&self) -> Option<Duration> {
        self.providers
            .iter()
            .map(|p| p.expire())
            .filter(|d| !d.is_zero())
            .min()
    }
}

/// Streaming SHA-256 of a file.
pub(crate) async fn file_sha256(path: &std::path::Path) -> std::io::Result<[u8; 32]> {
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}
