//! shardbin-core: configuration shared by the engine and the CLI

pub mod config;

pub use config::{
    Config, ConfigError, DownloadConfig, FileConfig, Mode, UploadConfig,
};
