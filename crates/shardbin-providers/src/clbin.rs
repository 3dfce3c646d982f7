//! clbin.com backend: multipart HTTPS upload

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Meta, Provider, ProviderError, CLBIN};

const BASE_URL: &str = "https://clbin.com";
const TIMEOUT: Duration = Duration::from_secs(15);
const FORM_FIELD: &str = "clbin";
const MAX_SIZE_BYTES: i64 = 10 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct ClbinMeta {
    url: String,
}

/// clbin.com provider. Retention is not documented.
pub struct Clbin {
    client: reqwest::Client,
    base_url: String,
}

impl Clbin {
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(ProviderError::Init)?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl Provider for Clbin {
    fn name(&self) -> &'static str {
        CLBIN
    }

    fn max_size(&self) -> i64 {
        MAX_SIZE_BYTES
    }

    fn expire(&self) -> Duration {
        Duration::ZERO
    }

    async fn upload(&self, payload: &[u8]) -> Result<Meta, ProviderError> {
        let encoded = BASE64.encode(payload);
        let form = multipart::Form::new().text(FORM_FIELD, encoded);

        let body = self
            .client
            .post(&self.base_url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let url = extract_url(&body)?;
        debug!(provider = CLBIN, %url, bytes = payload.len(), "uploaded");

        Ok(serde_json::value::to_raw_value(&ClbinMeta { url })?)
    }

    async fn download(&self, meta: &Meta) -> Result<Vec<u8>, ProviderError> {
        let meta: ClbinMeta = serde_json::from_str(meta.get())?;
        if meta.url.is_empty() {
            return Err(ProviderError::IncompleteMeta);
        }

        let body = self
            .client
            .get(&meta.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(BASE64.decode(body.trim())?)
    }
}

/// The response body may carry banner lines before the paste URL; the URL
/// is the last https line. clbin defangs it as `hxxps://` in some replies.
fn extract_url(body: &str) -> Result<String, ProviderError> {
    for line in body.trim().lines().rev() {
        let line = line.trim();
        if line.starts_with("https://") || line.starts_with("hxxps://") {
            return Ok(line.replacen("hxxps://", "https://", 1));
        }
    }
    Err(ProviderError::MissingUrl)
}
