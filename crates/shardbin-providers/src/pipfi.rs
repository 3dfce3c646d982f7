//! p.ip.fi backend: multipart HTTP upload
//!
//! The endpoint rejects unfamiliar user agents, so requests impersonate
//! wget.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Meta, Provider, ProviderError, PIPFI};

const BASE_URL: &str = "http://p.ip.fi";
const TIMEOUT: Duration = Duration::from_secs(15);
const FORM_FIELD: &str = "paste";
const USER_AGENT: &str = "Wget/1.21.1 (linux-gnu)";
const MAX_SIZE_BYTES: i64 = 10 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct PipfiMeta {
    url: String,
}

/// p.ip.fi provider. Retention is not guaranteed.
pub struct Pipfi {
    client: reqwest::Client,
    base_url: String,
}

impl Pipfi {
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::Init)?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl Provider for Pipfi {
    fn name(&self) -> &'static str {
        PIPFI
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

        let url = body.trim().to_string();
        if url.is_empty() {
            return Err(ProviderError::MissingUrl);
        }

        debug!(provider = PIPFI, %url, bytes = payload.len(), "uploaded");

        Ok(serde_json::value::to_raw_value(&PipfiMeta { url })?)
    }

    async fn download(&self, meta: &Meta) -> Result<Vec<u8>, ProviderError> {
        let meta: PipfiMeta = serde_json::from_str(meta.get())?;
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
