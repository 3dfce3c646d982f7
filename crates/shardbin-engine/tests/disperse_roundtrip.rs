//! End-to-end exercises of the upload/download/info engine against local
//! providers: replication, failover, integrity, and manifest tokens.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use shardbin_core::{Config, DownloadConfig, Mode, UploadConfig};
use shardbin_engine::{Engine, EngineError};
use shardbin_manifest::Meta;
use shardbin_providers::{Provider, ProviderError};

// ── A local paste bin with a configurable name ───────────────────────────────

static OBJECT_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct BinMeta {
    path: PathBuf,
}

/// Directory-backed provider so tests can run several distinct "remote"
/// endpoints side by side (and sabotage them).
struct LocalBin {
    label: &'static str,
    dir: PathBuf,
}

impl LocalBin {
    fn new(label: &'static str, dir: &Path) -> Self {
        std::fs::create_dir_all(dir).unwrap();
        Self {
            label,
            dir: dir.to_path_buf(),
        }
    }
}

#[async_trait]
impl Provider for LocalBin {
    fn name(&self) -> &'static str {
        self.label
    }

    fn max_size(&self) -> i64 {
        100 * 1024 * 1024
    }

    fn expire(&self) -> Duration {
        Duration::ZERO
    }

    async fn upload(&self, payload: &[u8]) -> Result<Meta, ProviderError> {
        let path = self
            .dir
            .join(format!("obj-{}", OBJECT_SEQ.fetch_add(1, Ordering::SeqCst)));
        tokio::fs::write(&path, payload).await?;
        Ok(serde_json::value::to_raw_value(&BinMeta { path })?)
    }

    async fn download(&self, meta: &Meta) -> Result<Vec<u8>, ProviderError> {
        let meta: BinMeta = serde_json::from_str(meta.get())?;
        Ok(tokio::fs::read(&meta.path).await?)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn upload_config(
    input: &Path,
    manifest: &str,
    chunks: i64,
    copies: usize,
    providers: Vec<String>,
) -> Config {
    Config {
        manifest: manifest.to_string(),
        password: SecretString::from("correct horse battery staple"),
        providers,
        options: HashMap::new(),
        ghost_mode: None,
        quiet: true,
        mode: Mode::Upload(UploadConfig {
            input: input.to_path_buf(),
            chunk_size: 0,
            chunks,
            copies,
        }),
    }
}

fn download_config(manifest: &str, output: &Path, password: &str) -> Config {
    Config {
        manifest: manifest.to_string(),
        password: SecretString::from(password),
        providers: Vec::new(),
        options: HashMap::new(),
        ghost_mode: None,
        quiet: true,
        mode: Mode::Download(DownloadConfig {
            output: output.to_path_buf(),
        }),
    }
}

fn two_bins(tmp: &TempDir) -> Vec<Box<dyn Provider>> {
    vec![
        Box::new(LocalBin::new("bin-a", &tmp.path().join("bin-a"))) as Box<dyn Provider>,
        Box::new(LocalBin::new("bin-b", &tmp.path().join("bin-b"))) as Box<dyn Provider>,
    ]
}

fn pseudo_random_bytes(len: usize) -> Vec<u8> {
    // xorshift keeps the fixture deterministic across runs
    let mut state = 0x243f_6a88_85a3_08d3u64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

fn write_input(tmp: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = tmp.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// ── Round trips ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn megabyte_roundtrip_with_replication() {
    let tmp = TempDir::new().unwrap();
    let original = pseudo_random_bytes(1024 * 1024);
    let input = write_input(&tmp, "input.bin", &original);
    let manifest = tmp.path().join("m.shard");
    let manifest_str = manifest.to_string_lossy().into_owned();

    let engine = Engine::with_providers(
        upload_config(&input, &manifest_str, 4, 2, Vec::new()),
        two_bins(&tmp),
    )
    .unwrap();
    let report = engine.upload(None).await.unwrap();

    assert_eq!(report.chunks, 4);
    assert_eq!(report.file_size, original.len() as i64);
    assert!(manifest.exists());

    let output = tmp.path().join("restored.bin");
    let engine = Engine::with_providers(
        download_config(&manifest_str, &output, "correct horse battery staple"),
        two_bins(&tmp),
    )
    .unwrap();
    let report = engine.download(None).await.unwrap();

    assert_eq!(report.chunks, 4);
    assert_eq!(std::fs::read(&output).unwrap(), original);
}

#[tokio::test]
async fn every_chunk_has_distinct_providers_per_copy() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "input.bin", &pseudo_random_bytes(4096));
    let manifest = tmp.path().join("m.shard").to_string_lossy().into_owned();

    let engine =
        Engine::with_providers(upload_config(&input, &manifest, 3, 2, Vec::new()), two_bins(&tmp))
            .unwrap();
    engine.upload(None).await.unwrap();

    let info = engine.info().await.unwrap();
    assert_eq!(info.content.chunks.len(), 3);

    for chunk in &info.content.chunks {
        assert_eq!(chunk.copies.len(), 2);
        assert_ne!(
            chunk.copies[0].provider, chunk.copies[1].provider,
            "copies of one chunk must land on distinct providers"
        );
    }
}

#[tokio::test]
async fn chunk_ids_are_sequential_from_one() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "input.bin", &pseudo_random_bytes(1000));
    let manifest = tmp.path().join("m.shard").to_string_lossy().into_owned();

    let engine =
        Engine::with_providers(upload_config(&input, &manifest, 4, 1, Vec::new()), two_bins(&tmp))
            .unwrap();
    engine.upload(None).await.unwrap();

    let info = engine.info().await.unwrap();
    let ids: Vec<u32> = info.content.chunks.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn single_byte_file_manifest_size() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "one.bin", b"x");
    let manifest = tmp.path().join("m.shard");
    let manifest_str = manifest.to_string_lossy().into_owned();

    let engine = Engine::with_providers(
        upload_config(&input, &manifest_str, 1, 1, Vec::new()),
        two_bins(&tmp),
    )
    .unwrap();
    engine.upload(None).await.unwrap();

    // 50-byte prefix + sealed descriptor + 16-byte tag.
    let info = engine.info().await.unwrap();
    let descriptor_len = info.content.encode().unwrap().len();
    let manifest_len = std::fs::metadata(&manifest).unwrap().len() as usize;
    assert_eq!(manifest_len, 50 + descriptor_len + 16);
}

// ── Failure behavior ─────────────────────────────────────────────────────────

#[tokio::test]
async fn copies_exceeding_providers_fail_at_construction() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "input.bin", b"data");
    let manifest = tmp.path().join("m.shard").to_string_lossy().into_owned();

    let result = Engine::with_providers(
        upload_config(&input, &manifest, 2, 3, Vec::new()),
        two_bins(&tmp),
    );

    assert!(matches!(
        result,
        Err(EngineError::CopiesExceedProviders {
            copies: 3,
            providers: 2
        })
    ));
}

#[tokio::test]
async fn wrong_password_fails_without_creating_output() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "input.bin", &pseudo_random_bytes(512));
    let manifest = tmp.path().join("m.shard").to_string_lossy().into_owned();

    let engine =
        Engine::with_providers(upload_config(&input, &manifest, 2, 1, Vec::new()), two_bins(&tmp))
            .unwrap();
    engine.upload(None).await.unwrap();

    let output = tmp.path().join("restored.bin");
    let engine = Engine::with_providers(
        download_config(&manifest, &output, "not the password"),
        two_bins(&tmp),
    )
    .unwrap();

    let result = engine.download(None).await;
    assert!(matches!(
        result,
        Err(EngineError::Manifest(
            shardbin_manifest::ManifestError::DecryptFailed(_)
        ))
    ));
    assert!(
        !output.exists(),
        "no output byte may be written when the manifest fails to open"
    );
}

#[tokio::test]
async fn download_survives_one_fully_corrupted_provider() {
    let tmp = TempDir::new().unwrap();
    let original = pseudo_random_bytes(10_000);
    let input = write_input(&tmp, "input.bin", &original);
    let manifest = tmp.path().join("m.shard").to_string_lossy().into_owned();

    let engine =
        Engine::with_providers(upload_config(&input, &manifest, 3, 2, Vec::new()), two_bins(&tmp))
            .unwrap();
    engine.upload(None).await.unwrap();

    // Scribble over everything bin-a stored: those copies now fail AEAD.
    for entry in std::fs::read_dir(tmp.path().join("bin-a")).unwrap() {
        let path = entry.unwrap().path();
        std::fs::write(&path, b"corrupted beyond recognition").unwrap();
    }

    let output = tmp.path().join("restored.bin");
    let engine = Engine::with_providers(
        download_config(&manifest, &output, "correct horse battery staple"),
        two_bins(&tmp),
    )
    .unwrap();
    engine.download(None).await.unwrap();

    assert_eq!(std::fs::read(&output).unwrap(), original);
}

#[tokio::test]
async fn download_survives_one_vanished_provider() {
    let tmp = TempDir::new().unwrap();
    let original = pseudo_random_bytes(5_000);
    let input = write_input(&tmp, "input.bin", &original);
    let manifest = tmp.path().join("m.shard").to_string_lossy().into_owned();

    let engine =
        Engine::with_providers(upload_config(&input, &manifest, 2, 2, Vec::new()), two_bins(&tmp))
            .unwrap();
    engine.upload(None).await.unwrap();

    // bin-b disappears wholesale: downloads from it fail with I/O errors.
    std::fs::remove_dir_all(tmp.path().join("bin-b")).unwrap();

    let output = tmp.path().join("restored.bin");
    let engine = Engine::with_providers(
        download_config(&manifest, &output, "correct horse battery staple"),
        two_bins(&tmp),
    )
    .unwrap();
    engine.download(None).await.unwrap();

    assert_eq!(std::fs::read(&output).unwrap(), original);
}

#[tokio::test]
async fn all_copies_lost_surfaces_last_error() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "input.bin", &pseudo_random_bytes(256));
    let manifest = tmp.path().join("m.shard").to_string_lossy().into_owned();

    let engine =
        Engine::with_providers(upload_config(&input, &manifest, 1, 2, Vec::new()), two_bins(&tmp))
            .unwrap();
    engine.upload(None).await.unwrap();

    std::fs::remove_dir_all(tmp.path().join("bin-a")).unwrap();
    std::fs::remove_dir_all(tmp.path().join("bin-b")).unwrap();

    let output = tmp.path().join("restored.bin");
    let engine = Engine::with_providers(
        download_config(&manifest, &output, "correct horse battery staple"),
        two_bins(&tmp),
    )
    .unwrap();

    assert!(engine.download(None).await.is_err());
}

#[tokio::test]
async fn tampered_manifest_ciphertext_fails_before_any_output() {
    let tmp = TempDir::new().unwrap();
    let input = write_input(&tmp, "input.bin", &pseudo_random_bytes(512));
    let manifest_path = tmp.path().join("m.shard");
    let manifest = manifest_path.to_string_lossy().into_owned();

    let engine =
        Engine::with_providers(upload_config(&input, &manifest, 2, 1, Vec::new()), two_bins(&tmp))
            .unwrap();
    engine.upload(None).await.unwrap();

    // Flip a single ciphertext bit past the 50-byte prefix.
    let mut bytes = std::fs::read(&manifest_path).unwrap();
    bytes[60] ^= 0x01;
    std::fs::write(&manifest_path, &bytes).unwrap();

    let output = tmp.path().join("restored.bin");
    let engine = Engine::with_providers(
        download_config(&manifest, &output, "correct horse battery staple"),
        two_bins(&tmp),
    )
    .unwrap();

    assert!(engine.download(None).await.is_err());
    assert!(!output.exists());
}

// ── Manifest tokens and ghost carriers ───────────────────────────────────────

#[tokio::test]
async fn provider_token_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let original = pseudo_random_bytes(2048);
    let input = write_input(&tmp, "input.bin", &original);

    let mut options = HashMap::new();
    options.insert(
        "dummy-path".to_string(),
        tmp.path().to_string_lossy().into_owned(),
    );

    let mut config = upload_config(&input, "provider:dummy", 2, 1, vec!["dummy".into()]);
    config.options = options.clone();

    let engine = Engine::new(config).unwrap();
    let report = engine.upload(None).await.unwrap();
    assert!(report.manifest_location.starts_with("provider:dummy:"));

    let output = tmp.path().join("restored.bin");
    let mut config = download_config(
        &report.manifest_location,
        &output,
        "correct horse battery staple",
    );
    config.providers = vec!["dummy".into()];
    config.options = options;

    let engine = Engine::new(config).unwrap();
    engine.download(None).await.unwrap();

    assert_eq!(std::fs::read(&output).unwrap(), original);
}

#[tokio::test]
async fn ghost_image_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let original = pseudo_random_bytes(700);
    let input = write_input(&tmp, "input.bin", &original);
    let manifest = tmp.path().join("carrier.png");
    let manifest_str = manifest.to_string_lossy().into_owned();

    let mut config = upload_config(&input, &manifest_str, 1, 1, Vec::new());
    config.ghost_mode = Some(shardbin_ghost::GhostMode::Image);
    let engine = Engine::with_providers(config, two_bins(&tmp)).unwrap();
    engine.upload(None).await.unwrap();

    // The carrier on disk is an ordinary PNG.
    let carrier = std::fs::read(&manifest).unwrap();
    assert_eq!(&carrier[..8], b"\x89PNG\r\n\x1a\n");

    let output = tmp.path().join("restored.bin");
    let mut config = download_config(&manifest_str, &output, "correct horse battery staple");
    config.ghost_mode = Some(shardbin_ghost::GhostMode::Image);
    let engine = Engine::with_providers(config, two_bins(&tmp)).unwrap();
    engine.download(None).await.unwrap();

    assert_eq!(std::fs::read(&output).unwrap(), original);
}

#[tokio::test]
async fn ghost_qrcode_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let original = pseudo_random_bytes(300);
    let input = write_input(&tmp, "input.bin", &original);
    let manifest = tmp.path().join("carrier-qr.png");
    let manifest_str = manifest.to_string_lossy().into_owned();

    let mut config = upload_config(&input, &manifest_str, 1, 1, Vec::new());
    config.ghost_mode = Some(shardbin_ghost::GhostMode::Qrcode);
    let engine = Engine::with_providers(config, two_bins(&tmp)).unwrap();
    engine.upload(None).await.unwrap();

    let output = tmp.path().join("restored.bin");
    let mut config = download_config(&manifest_str, &output, "correct horse battery staple");
    config.ghost_mode = Some(shardbin_ghost::GhostMode::Qrcode);
    let engine = Engine::with_providers(config, two_bins(&tmp)).unwrap();
    engine.download(None).await.unwrap();

    assert_eq!(std::fs::read(&output).unwrap(), original);
}

// ── Info ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn info_reports_manifest_contents() {
    let tmp = TempDir::new().unwrap();
    let original = pseudo_random_bytes(3000);
    let input = write_input(&tmp, "input.bin", &original);
    let manifest = tmp.path().join("m.shard").to_string_lossy().into_owned();

    let engine =
        Engine::with_providers(upload_config(&input, &manifest, 3, 2, Vec::new()), two_bins(&tmp))
            .unwrap();
    engine.upload(None).await.unwrap();

    let info = engine.info().await.unwrap();
    assert_eq!(info.version, 1);
    assert_eq!(info.parameters.kdf, 1);
    assert_eq!(info.parameters.cipher, 1);
    assert_eq!(info.content.size, original.len() as i64);
    assert_eq!(info.content.chunks.len(), 3);
    assert!(
        !info.chunk_chain_matches,
        "multi-chunk uploads cannot satisfy the chunk-hash chain"
    );
}
