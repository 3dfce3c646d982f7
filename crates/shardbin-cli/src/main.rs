//! shardbin: split, encrypt, and scatter files across paste sites
//!
//! Commands:
//!   upload    - chunk a file, encrypt, disperse copies, write a manifest
//!   download  - rebuild a file from a manifest and its password
//!   info      - open a manifest and show what is inside
//!   providers - list the built-in storage providers

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;

use shardbin_core::{Config, DownloadConfig, FileConfig, Mode, UploadConfig};
use shardbin_engine::{Engine, ManifestInfo, ProgressFn, UploadReport};
use shardbin_ghost::GhostMode;

// ── CLI structure ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "shardbin",
    version,
    about = "Securely split, encrypt, and redundantly scatter files across paste providers",
    long_about = "shardbin splits a file into encrypted chunks, stores redundant copies \
                  on public paste sites, and emits a small manifest that, together with \
                  the password, is all you need to get the file back."
)]
struct Cli {
    /// Path to an optional defaults file (providers, copies, options)
    #[arg(
        long,
        env = "SHARDBIN_CONFIG",
        default_value = "~/.config/shardbin/config.toml",
        global = true
    )]
    config: PathBuf,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, env = "SHARDBIN_LOG", default_value = "warn", global = true)]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a file: chunk, encrypt, and disperse
    #[command(visible_alias = "u")]
    Upload {
        /// File to upload
        #[arg(long, short = 'f')]
        file: PathBuf,
        /// Encryption password (prompted when omitted)
        #[arg(long, short = 'p', env = "SHARDBIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Manifest destination: a path, or provider:<name>
        #[arg(long, short = 'm')]
        manifest: String,
        /// Fixed chunk size in bytes
        #[arg(long, short = 's', conflicts_with = "chunks")]
        chunk_size: Option<i64>,
        /// Number of chunks to split into (default: 3)
        #[arg(long, short = 'c')]
        chunks: Option<i64>,
        /// Redundant copies per chunk, each on a distinct provider
        #[arg(long, short = 'n')]
        copies: Option<usize>,
        /// Providers to use (repeatable; default: the built-in set)
        #[arg(long, short = 'P', value_delimiter = ',')]
        providers: Vec<String>,
        /// Conceal the manifest in a carrier: image or qrcode
        #[arg(long, short = 'g', value_parser = parse_ghost_mode)]
        ghost: Option<GhostMode>,
        /// Suppress progress output
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Download a file using its manifest and password
    #[command(visible_alias = "d")]
    Download {
        /// Manifest source: a path, or provider:<name>:<base64 meta>
        #[arg(long, short = 'm')]
        manifest: String,
        /// Encryption password (prompted when omitted)
        #[arg(long, short = 'p', env = "SHARDBIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output file path
        #[arg(long, short = 'f')]
        file: PathBuf,
        /// Decode the manifest from a carrier: image or qrcode
        #[arg(long, short = 'g', value_parser = parse_ghost_mode)]
        ghost: Option<GhostMode>,
        /// Suppress progress output
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Display manifest information
    #[command(visible_alias = "i")]
    Info {
        /// Manifest source: a path, or provider:<name>:<base64 meta>
        #[arg(long, short = 'm')]
        manifest: String,
        /// Encryption password (prompted when omitted)
        #[arg(long, short = 'p', env = "SHARDBIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Decode the manifest from a carrier: image or qrcode
        #[arg(long, short = 'g', value_parser = parse_ghost_mode)]
        ghost: Option<GhostMode>,
    },

    /// List available storage providers
    #[command(visible_alias = "p")]
    Providers,
}

fn parse_ghost_mode(s: &str) -> Result<GhostMode, String> {
    s.parse::<GhostMode>().map_err(|e| e.to_string())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let defaults = FileConfig::load(&expand_tilde(&cli.config))
        .with_context(|| format!("loading config: {}", cli.config.display()))?;

    match cli.command {
        Commands::Upload {
            file,
            password,
            manifest,
            chunk_size,
            chunks,
            copies,
            providers,
            ghost,
            quiet,
        } => {
            cmd_upload(
                &defaults, file, password, manifest, chunk_size, chunks, copies, providers, ghost,
                quiet,
            )
            .await
        }
        Commands::Download {
            manifest,
            password,
            file,
            ghost,
            quiet,
        } => cmd_download(&defaults, manifest, password, file, ghost, quiet).await,
        Commands::Info {
            manifest,
            password,
            ghost,
        } => cmd_info(&defaults, manifest, password, ghost).await,
        Commands::Providers => cmd_providers(),
    }
}

// ── Logging ───────────────────────────────────────────────────────────────────

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ── Password prompt ───────────────────────────────────────────────────────────

/// Resolve a password: use the provided value, or prompt interactively.
fn resolve_password(password: Option<String>) -> Result<SecretString> {
    match password {
        Some(p) => Ok(SecretString::from(p)),
        None => rpassword::prompt_password("Password: ")
            .map(SecretString::from)
            .context("failed to read password from terminal"),
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_default();
        PathBuf::from(format!("{}/{}", home, rest))
    } else {
        path.to_path_buf()
    }
}

// ── Progress bar helpers ──────────────────────────────────────────────────────

fn make_progress_bar(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn progress_callback(pb: &ProgressBar) -> ProgressFn {
    let pb = pb.clone();
    Box::new(move |done, total, msg| {
        pb.set_length(total);
        pb.set_position(done);
        pb.set_message(msg.to_string());
    })
}

// ── `shardbin upload` ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
async fn cmd_upload(
    defaults: &FileConfig,
    file: PathBuf,
    password: Option<String>,
    manifest: String,
    chunk_size: Option<i64>,
    chunks: Option<i64>,
    copies: Option<usize>,
    providers: Vec<String>,
    ghost: Option<GhostMode>,
    quiet: bool,
) -> Result<()> {
    let password = resolve_password(password)?;

    // Flags win over the defaults file; a fixed chunk size disables the
    // chunk-count sizing entirely.
    let (chunk_size, chunks) = match chunk_size {
        Some(size) => (size, 0),
        None => (0, chunks.or(defaults.chunks).unwrap_or(3)),
    };

    let config = Config {
        manifest,
        password,
        providers: merge_providers(providers, defaults),
        options: defaults.options.clone(),
        ghost_mode: ghost,
        quiet: quiet || defaults.quiet,
        mode: Mode::Upload(UploadConfig {
            input: file.clone(),
            chunk_size,
            chunks,
            copies: copies.or(defaults.copies).unwrap_or(1),
        }),
    };

    let engine = Engine::new(config).context("initializing engine")?;

    let report = if quiet {
        engine.upload(None).await
    } else {
        let pb = make_progress_bar("upload");
        pb.set_message(format!("{}", file.display()));
        let progress = progress_callback(&pb);
        let result = engine.upload(Some(&progress)).await;
        pb.finish_with_message("done");
        result
    }
    .with_context(|| format!("uploading {}", file.display()))?;

    print_upload_report(&report, quiet);
    Ok(())
}

fn merge_providers(flag: Vec<String>, defaults: &FileConfig) -> Vec<String> {
    if !flag.is_empty() {
        flag
    } else {
        defaults.providers.clone()
    }
}

fn print_upload_report(report: &UploadReport, quiet: bool) {
    if quiet {
        // Quiet mode still needs the shareable token on stdout.
        println!("{}", report.manifest_location);
        return;
    }
    println!();
    println!("Upload complete:");
    println!("  manifest: {}", report.manifest_location);
    println!("  bytes:    {}", fmt_bytes(report.file_size as u64));
    println!("  chunks:   {} ({} copies each)", report.chunks, report.copies);
    match report.expires {
        Some(expire) => println!("  expires:  in {}", fmt_duration(expire)),
        None => println!("  expires:  unknown (provider retention not advertised)"),
    }
}

// ── `shardbin download` ───────────────────────────────────────────────────────

async fn cmd_download(
    defaults: &FileConfig,
    manifest: String,
    password: Option<String>,
    file: PathBuf,
    ghost: Option<GhostMode>,
    quiet: bool,
) -> Result<()> {
    let password = resolve_password(password)?;

    let config = Config {
        manifest: manifest.clone(),
        password,
        providers: defaults.providers.clone(),
        options: defaults.options.clone(),
        ghost_mode: ghost,
        quiet: quiet || defaults.quiet,
        mode: Mode::Download(DownloadConfig {
            output: file.clone(),
        }),
    };

    let engine = Engine::new(config).context("initializing engine")?;

    let report = if quiet {
        engine.download(None).await
    } else {
        let pb = make_progress_bar("download");
        pb.set_message("fetching manifest...");
        let progress = progress_callback(&pb);
        let result = engine.download(Some(&progress)).await;
        pb.finish_with_message("done");
        result
    }
    .with_context(|| format!("downloading {}", manifest))?;

    if !quiet {
        println!();
        println!("Download complete:");
        println!("  output: {}", report.output.display());
        println!("  bytes:  {}", fmt_bytes(report.bytes as u64));
        println!("  chunks: {}", report.chunks);
    }
    Ok(())
}

// ── `shardbin info` ───────────────────────────────────────────────────────────

async fn cmd_info(
    defaults: &FileConfig,
    manifest: String,
    password: Option<String>,
    ghost: Option<GhostMode>,
) -> Result<()> {
    let password = resolve_password(password)?;

    let config = Config {
        manifest: manifest.clone(),
        password,
        providers: defaults.providers.clone(),
        options: defaults.options.clone(),
        ghost_mode: ghost,
        quiet: true,
        mode: Mode::Info,
    };

    let engine = Engine::new(config).context("initializing engine")?;
    let info = engine
        .info()
        .await
        .with_context(|| format!("reading manifest {}", manifest))?;

    print_manifest_info(&info);
    Ok(())
}

fn print_manifest_info(info: &ManifestInfo) {
    println!("Manifest version:  {}", info.version);
    println!("Crypto parameters:");
    println!("  kdf:     {} (Argon2id)", info.parameters.kdf);
    println!("  cipher:  {} (XChaCha20-Poly1305)", info.parameters.cipher);
    println!("  salt:    {}", hex(&info.parameters.salt));
    println!("  nonce:   {}", hex(&info.parameters.nonce));
    println!();
    println!("File size:  {} bytes", info.content.size);
    println!("File hash:  {}", hex(&info.content.hash));
    println!("Chunks:     {}", info.content.chunks.len());
    println!("Chain ok:   {}", info.chunk_chain_matches);
    println!();

    for chunk in &info.content.chunks {
        println!("Chunk {}:", chunk.id);
        println!("  size:   {} bytes", chunk.size);
        println!("  hash:   {}", hex(&chunk.hash));
        println!("  copies: {}", chunk.copies.len());
        for (i, copy) in chunk.copies.iter().enumerate() {
            println!("    copy {}: {} {}", i, copy.provider, copy.meta.get());
        }
    }
}

// ── `shardbin providers` ──────────────────────────────────────────────────────

fn cmd_providers() -> Result<()> {
    println!("Available providers:");
    for name in shardbin_providers::DEFAULT_PROVIDERS {
        println!("  - {name}");
    }
    println!("  - {} (local filesystem, for testing)", shardbin_providers::DUMMY);
    Ok(())
}

// ── Utilities ─────────────────────────────────────────────────────────────────

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn fmt_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 86400 {
        format!("{} days", secs / 86400)
    } else if secs >= 3600 {
        format!("{} hours", secs / 3600)
    } else {
        format!("{} minutes", secs / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_bytes_scales() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(2048), "2.0 KB");
        assert_eq!(fmt_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn fmt_duration_scales() {
        assert_eq!(fmt_duration(Duration::from_secs(30 * 86400)), "30 days");
        assert_eq!(fmt_duration(Duration::from_secs(7200)), "2 hours");
        assert_eq!(fmt_duration(Duration::from_secs(120)), "2 minutes");
    }

    #[test]
    fn hex_renders_lowercase_pairs() {
        assert_eq!(hex(&[0x00, 0xab, 0xff]), "00abff");
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths() {
        assert_eq!(
            expand_tilde(Path::new("/etc/shardbin.toml")),
            PathBuf::from("/etc/shardbin.toml")
        );
    }

    #[test]
    fn cli_parses_upload() {
        let cli = Cli::try_parse_from([
            "shardbin", "upload", "-f", "file.bin", "-p", "pw", "-m", "out.shard", "-c", "4",
            "-n", "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Upload {
                chunks, copies, ..
            } => {
                assert_eq!(chunks, Some(4));
                assert_eq!(copies, Some(2));
            }
            _ => panic!("expected upload"),
        }
    }

    #[test]
    fn cli_rejects_chunk_size_with_chunks() {
        let result = Cli::try_parse_from([
            "shardbin", "upload", "-f", "f", "-p", "pw", "-m", "m", "-s", "1024", "-c", "4",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_rejects_bad_ghost_mode() {
        let result = Cli::try_parse_from([
            "shardbin", "info", "-m", "m", "-p", "pw", "-g", "hologram",
        ]);
        assert!(result.is_err());
    }
}
