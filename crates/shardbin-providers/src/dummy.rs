//! Local filesystem backend for tests and offline runs

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::{Meta, Options, Provider, ProviderError, DUMMY};

/// Options key selecting the directory payloads are written into.
pub const OPTION_BASE_PATH: &str = "dummy-path";

const MAX_SIZE_BYTES: i64 = 100 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct DummyMeta {
    path: PathBuf,
}

/// Filesystem provider: each payload lands in its own file under the
/// configured base directory. Payloads are stored raw; there is no
/// text-only channel to survive.
pub struct Dummy {
    base_path: PathBuf,
}

impl Dummy {
    pub fn new(options: &Options) -> Self {
        let base_path = options
            .get(OPTION_BASE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        Self { base_path }
    }
}

#[async_trait]
impl Provider for Dummy {
    fn name(&self) -> &'static str {
        DUMMY
    }

    fn max_size(&self) -> i64 {
        MAX_SIZE_BYTES
    }

    fn expire(&self) -> Duration {
        Duration::ZERO
    }

    async fn upload(&self, payload: &[u8]) -> Result<Meta, ProviderError> {
        let file = Builder::new()
            .prefix("shardbin-dummy-")
            .tempfile_in(&self.base_path)?;
        let (file, path) = file.keep().map_err(|e| ProviderError::Io(e.error))?;
        drop(file);

        if let Err(e) = tokio::fs::write(&path, payload).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(ProviderError::Payload(e));
        }

        Ok(serde_json::value::to_raw_value(&DummyMeta { path })?)
    }

    async fn download(&self, meta: &Meta) -> Result<Vec<u8>, ProviderError> {
        let meta: DummyMeta = serde_json::from_str(meta.get())?;
        if meta.path.as_os_str().is_empty() {
            return Err(ProviderError::IncompleteMeta);
        }

        Ok(tokio::fs::read(&meta.path).await?)
    }
}
