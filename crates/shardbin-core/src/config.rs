//! Engine configuration: one tagged mode, validated at construction
//!
//! The mode is a proper enum, so a configuration carrying both an upload
//! and a download branch cannot be expressed. Validation covers everything
//! else: empty paths, zero copies, and ambiguous chunk settings.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shardbin_ghost::GhostMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("input file path must not be empty")]
    InvalidInputFilePath,

    #[error("output file path must not be empty")]
    InvalidOutputFilePath,

    #[error("manifest path must not be empty")]
    InvalidManifestPath,

    #[error("exactly one of chunk size or chunk count must be set")]
    InvalidChunkConfig,

    #[error("copies must be at least 1")]
    InvalidCopies,

    #[error("password must not be empty")]
    InvalidPassword,

    #[error("config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path}: {source}")]
    FileParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Upload-specific settings. Exactly one of `chunk_size` and `chunks`
/// must be positive.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub input: PathBuf,
    /// Fixed chunk size in bytes; 0 when `chunks` drives the sizing.
    pub chunk_size: i64,
    /// Target number of chunks; 0 when `chunk_size` drives the sizing.
    pub chunks: i64,
    /// Redundant copies per chunk, each on a distinct provider.
    pub copies: usize,
}

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub output: PathBuf,
}

/// What the engine has been asked to do.
#[derive(Debug, Clone)]
pub enum Mode {
    Upload(UploadConfig),
    Download(DownloadConfig),
    Info,
}

/// Validated engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Manifest destination or source: a filesystem path, `provider:<name>`
    /// on upload, or `provider:<name>:<base64 meta>` on download.
    pub manifest: String,
    pub password: SecretString,
    /// Provider names; empty means the default set.
    pub providers: Vec<String>,
    /// Provider-specific options in key=value form.
    pub options: HashMap<String, String>,
    pub ghost_mode: Option<GhostMode>,
    pub quiet: bool,
    pub mode: Mode,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.manifest.is_empty() {
            return Err(ConfigError::InvalidManifestPath);
        }
        if self.password.expose_secret().is_empty() {
            return Err(ConfigError::InvalidPassword);
        }

        match &self.mode {
            Mode::Upload(upload) => {
                if upload.input.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidInputFilePath);
                }
                let by_size = upload.chunk_size > 0;
                let by_count = upload.chunks > 0;
                if by_size == by_count {
                    return Err(ConfigError::InvalidChunkConfig);
                }
                if upload.copies == 0 {
                    return Err(ConfigError::InvalidCopies);
                }
            }
            Mode::Download(download) => {
                if download.output.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidOutputFilePath);
                }
            }
            Mode::Info => {}
        }

        Ok(())
    }
}

/// Optional defaults loaded from a TOML file and merged under CLI flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Default provider names used when the command line passes none.
    pub providers: Vec<String>,
    /// Default copies per chunk.
    pub copies: Option<usize>,
    /// Default chunk count.
    pub chunks: Option<i64>,
    /// Provider options in key=value form.
    pub options: HashMap<String, String>,
    /// Suppress progress output by default.
    pub quiet: bool,
}

impl FileConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::FileParse {
            path: path.to_path_buf(),
            source,
        })
    }
}
