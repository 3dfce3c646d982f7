//! shardbin-providers: pluggable paste-style storage endpoints
//!
//! Every backend implements the same contract: opaque bytes in, opaque
//! JSON meta out, and back again. Network providers Base64-encode the
//! payload on the wire so ciphertext survives text-only paste channels.
//! The engine never sees inside a provider's meta, and a provider never
//! sees inside the payload.

pub mod clbin;
pub mod dummy;
pub mod pastecnetorg;
pub mod pipfi;
pub mod registry;
pub mod termbin;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use registry::build;
pub use shardbin_manifest::Meta;

/// Stable provider names, matched against chunk-copy records.
pub const TERMBIN: &str = "termbin";
pub const CLBIN: &str = "clbin";
pub const PIPFI: &str = "pipfi";
pub const PASTECNETORG: &str = "pastecnetorg";
pub const DUMMY: &str = "dummy";

/// Providers used when the configuration names none. The dummy backend is
/// deliberately absent: it must be requested explicitly.
pub const DEFAULT_PROVIDERS: &[&str] = &[TERMBIN, CLBIN, PIPFI, PASTECNETORG];

/// Provider-specific configuration options in key=value form.
pub type Options = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider {0:?}")]
    UnknownProvider(String),

    #[error("client init failed: {0}")]
    Init(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("connect to {endpoint} failed: {source}")]
    Connect {
        endpoint: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("sending payload failed: {0}")]
    Payload(#[source] std::io::Error),

    #[error("reading response failed: {0}")]
    Response(#[source] std::io::Error),

    #[error("no paste URL in response")]
    MissingUrl,

    #[error("meta is missing a required field")]
    IncompleteMeta,

    #[error("meta decode failed: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("stored payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The uniform storage contract.
///
/// Calls suspend only on network and file I/O; dropping the returned
/// future cancels the in-flight request.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier recorded in chunk-copy entries.
    fn name(&self) -> &'static str;

    /// Store `payload`, returning provider-defined meta needed to fetch it.
    async fn upload(&self, payload: &[u8]) -> Result<Meta, ProviderError>;

    /// Fetch a payload previously stored under `meta`.
    async fn download(&self, meta: &Meta) -> Result<Vec<u8>, ProviderError>;

    /// Largest single payload the endpoint accepts, in bytes.
    fn max_size(&self) -> i64;

    /// Server-side retention estimate; zero means unknown or unbounded.
    fn expire(&self) -> Duration;
}
