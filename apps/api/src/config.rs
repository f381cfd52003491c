use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::batch::BatchPolicy;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// When false, a canned offline generator replaces the Anthropic client.
    pub use_llm: bool,
    pub anthropic_api_key: Option<String>,
    pub public_base_url: String,
    pub generated_dir: PathBuf,
    pub timing_file: PathBuf,
    pub chrome_bin: PathBuf,
    pub s3: Option<S3Config>,
    pub batch: BatchPolicy,
    pub paragraphs_per_page: usize,
    pub progress_session_ttl: Duration,
}

/// Object storage settings. Uploads are disabled when `S3_BUCKET` is unset.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub prefix: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port = parse_env("PORT", 8080u16)?;
        let use_llm = parse_env("USE_LLM", true)?;
        let anthropic_api_key = if use_llm {
            Some(require_env("ANTHROPIC_API_KEY")?)
        } else {
            std::env::var("ANTHROPIC_API_KEY").ok()
        };

        let s3 = match std::env::var("S3_BUCKET") {
            Ok(bucket) if !bucket.trim().is_empty() => Some(S3Config {
                bucket,
                endpoint: std::env::var("S3_ENDPOINT").ok(),
                region: env_or("S3_REGION", "us-east-1"),
                prefix: env_or("S3_PREFIX", "forecasts"),
                access_key_id: std::env::var("AWS_ACCESS_KEY_ID").ok(),
                secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
            }),
            _ => None,
        };

        let batch = BatchPolicy {
            item_delay: Duration::from_secs(parse_env("BATCH_ITEM_DELAY_SECS", 2u64)?),
            min_file_bytes: parse_env("BATCH_MIN_FILE_BYTES", 130 * 1024u64)?,
            max_size_retries: parse_env("BATCH_SIZE_RETRIES", 2u32)?,
            retry_backoff: Duration::from_secs(parse_env("BATCH_RETRY_BACKOFF_SECS", 5u64)?),
            rate_limit_cooldown: Duration::from_secs(parse_env(
                "BATCH_RATE_LIMIT_COOLDOWN_SECS",
                60u64,
            )?),
        };

        Ok(Config {
            port,
            rust_log: env_or("RUST_LOG", "info"),
            use_llm,
            anthropic_api_key,
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}"))
                .trim_end_matches('/')
                .to_string(),
            generated_dir: PathBuf::from(env_or("GENERATED_DIR", "generated")),
            timing_file: PathBuf::from(env_or("TIMING_FILE", "data/timing.json")),
            chrome_bin: PathBuf::from(env_or("CHROME_BIN", "chromium")),
            s3,
            batch,
            paragraphs_per_page: parse_env("PARAGRAPHS_PER_PAGE", 14usize)?,
            progress_session_ttl: Duration::from_secs(parse_env(
                "PROGRESS_SESSION_TTL_SECS",
                3600u64,
            )?),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
