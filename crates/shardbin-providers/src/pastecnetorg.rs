//! paste.c-net.org backend: netcat-style TCP upload, HTTP download

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::{Meta, Provider, ProviderError, PASTECNETORG};

const ENDPOINT: &str = "paste.c-net.org:9999";
const TIMEOUT: Duration = Duration::from_secs(15);
const MAX_SIZE_BYTES: i64 = 10 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct PasteMeta {
    url: String,
}

/// paste.c-net.org provider.
pub struct Pastecnetorg {
    client: reqwest::Client,
}

impl Pastecnetorg {
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(ProviderError::Init)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Provider for Pastecnetorg {
    fn name(&self) -> &'static str {
        PASTECNETORG
    }

    fn max_size(&self) -> i64 {
        MAX_SIZE_BYTES
    }

    fn expire(&self) -> Duration {
        Duration::from_secs(180 * 24 * 60 * 60)
    }

    async fn upload(&self, payload: &[u8]) -> Result<Meta, ProviderError> {
        let encoded = BASE64.encode(payload);

        let mut stream = timeout(TIMEOUT, TcpStream::connect(ENDPOINT))
            .await
            .map_err(|_| ProviderError::Timeout(TIMEOUT))?
            .map_err(|e| ProviderError::Connect {
                endpoint: ENDPOINT,
                source: e,
            })?;

        stream
            .write_all(encoded.as_bytes())
            .await
            .map_err(ProviderError::Payload)?;
        stream.shutdown().await.map_err(ProviderError::Payload)?;

        let mut response = Vec::new();
        timeout(TIMEOUT, stream.read_to_end(&mut response))
            .await
            .map_err(|_| ProviderError::Timeout(TIMEOUT))?
            .map_err(ProviderError::Response)?;

        // The endpoint pads its reply with NULs and whitespace.
        let url = String::from_utf8_lossy(&response)
            .trim_matches(&['\0', '\r', '\n', ' '][..])
            .to_string();
        if url.is_empty() {
            return Err(ProviderError::MissingUrl);
        }

        debug!(provider = PASTECNETORG, %url, bytes = payload.len(), "uploaded");

        Ok(serde_json::value::to_raw_value(&PasteMeta { url })?)
    }

    async fn download(&self, meta: &Meta) -> Result<Vec<u8>, ProviderError> {
        let meta: PasteMeta = serde_json::from_str(meta.get())?;
        let url = meta.url.trim();
        if url.is_empty() {
            return Err(ProviderError::IncompleteMeta);
        }

        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(BASE64.decode(body.trim())?)
    }
}
