//! Configuration module
//!
//! Env-driven configuration for the ingest API server and the uploader
//! client: server, database, provider, upload limits, and retry/backoff
//! tunables.

use std::env;
use std::time::Duration;

// Defaults
const SERVER_PORT: u16 = 3000;
const DB_MAX_CONNECTIONS: u32 = 20;
const DB_TIMEOUT_SECS: u64 = 30;
const PROVIDER_TIMEOUT_SECS: u64 = 30;
const MAX_VIDEO_SIZE_MB: u64 = 2048;
const CHUNK_SIZE_BYTES: u64 = 8 * 1024 * 1024;
const TICKET_MAX_ATTEMPTS: u32 = 3;
const TICKET_BACKOFF_BASE_MS: u64 = 500;
const STREAM_MAX_RECONNECTS: u32 = 5;
const STREAM_BACKOFF_BASE_MS: u64 = 1_000;
const STREAM_BACKOFF_CAP_MS: u64 = 30_000;
const POLL_INITIAL_MS: u64 = 5_000;
const POLL_BACKOFF_FACTOR: f64 = 1.5;
const POLL_CAP_MS: u64 = 30_000;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// HTTP server settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

/// Database pool settings.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_seconds: u64,
}

/// External video provider settings.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout_seconds: u64,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// File validation and chunking limits for uploads.
#[derive(Clone, Debug)]
pub struct UploadLimits {
    pub max_file_size_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub chunk_size_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size_bytes: MAX_VIDEO_SIZE_MB * 1024 * 1024,
            allowed_content_types: default_content_types(),
            chunk_size_bytes: CHUNK_SIZE_BYTES,
        }
    }
}

fn default_content_types() -> Vec<String> {
    "video/mp4,video/quicktime,video/webm,video/x-matroska"
        .split(',')
        .map(|s| s.to_string())
        .collect()
}

/// Retry and backoff tunables for ticket acquisition and the status channel.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub ticket_max_attempts: u32,
    pub ticket_backoff_base_ms: u64,
    pub stream_max_reconnects: u32,
    pub stream_backoff_base_ms: u64,
    pub stream_backoff_cap_ms: u64,
    pub poll_initial_ms: u64,
    pub poll_backoff_factor: f64,
    pub poll_cap_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            ticket_max_attempts: TICKET_MAX_ATTEMPTS,
            ticket_backoff_base_ms: TICKET_BACKOFF_BASE_MS,
            stream_max_reconnects: STREAM_MAX_RECONNECTS,
            stream_backoff_base_ms: STREAM_BACKOFF_BASE_MS,
            stream_backoff_cap_ms: STREAM_BACKOFF_CAP_MS,
            poll_initial_ms: POLL_INITIAL_MS,
            poll_backoff_factor: POLL_BACKOFF_FACTOR,
            poll_cap_ms: POLL_CAP_MS,
        }
    }
}

impl RetryConfig {
    /// Backoff before ticket attempt `attempt` (1-based; no delay before the
    /// first attempt). Doubles per attempt.
    pub fn ticket_backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.ticket_backoff_base_ms.saturating_mul(factor))
    }

    /// Backoff before stream reconnect `attempt` (1-based), capped.
    pub fn stream_backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let ms = self
            .stream_backoff_base_ms
            .saturating_mul(factor)
            .min(self.stream_backoff_cap_ms);
        Duration::from_millis(ms)
    }

    /// Next poll interval given the previous one, multiplicative and capped.
    pub fn next_poll_interval(&self, previous: Duration) -> Duration {
        let ms = (previous.as_millis() as f64 * self.poll_backoff_factor) as u64;
        Duration::from_millis(ms.min(self.poll_cap_ms))
    }

    pub fn initial_poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_initial_ms)
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub limits: UploadLimits,
    pub retry: RetryConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env_or("CORS_ORIGINS", "*");
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let allowed_content_types: Vec<String> = env::var("VIDEO_ALLOWED_CONTENT_TYPES")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|_| default_content_types());

        Ok(Self {
            server: ServerConfig {
                port: env_parse_or("PORT", SERVER_PORT),
                cors_origins,
                environment,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
                max_connections: env_parse_or("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
                timeout_seconds: env_parse_or("DB_TIMEOUT_SECONDS", DB_TIMEOUT_SECS),
            },
            provider: ProviderConfig {
                base_url: env_or("VIDEO_PROVIDER_URL", "https://api.video-provider.example"),
                api_token: env::var("VIDEO_PROVIDER_TOKEN").ok(),
                timeout_seconds: env_parse_or("VIDEO_PROVIDER_TIMEOUT_SECS", PROVIDER_TIMEOUT_SECS),
            },
            limits: UploadLimits {
                max_file_size_bytes: env_parse_or("MAX_VIDEO_SIZE_MB", MAX_VIDEO_SIZE_MB)
                    * 1024
                    * 1024,
                allowed_content_types,
                chunk_size_bytes: env_parse_or("UPLOAD_CHUNK_SIZE_BYTES", CHUNK_SIZE_BYTES),
            },
            retry: RetryConfig {
                ticket_max_attempts: env_parse_or("TICKET_MAX_ATTEMPTS", TICKET_MAX_ATTEMPTS),
                ticket_backoff_base_ms: env_parse_or(
                    "TICKET_BACKOFF_BASE_MS",
                    TICKET_BACKOFF_BASE_MS,
                ),
                stream_max_reconnects: env_parse_or(
                    "STREAM_MAX_RECONNECTS",
                    STREAM_MAX_RECONNECTS,
                ),
                stream_backoff_base_ms: env_parse_or(
                    "STREAM_BACKOFF_BASE_MS",
                    STREAM_BACKOFF_BASE_MS,
                ),
                stream_backoff_cap_ms: env_parse_or("STREAM_BACKOFF_CAP_MS", STREAM_BACKOFF_CAP_MS),
                poll_initial_ms: env_parse_or("POLL_INITIAL_MS", POLL_INITIAL_MS),
                poll_backoff_factor: env_parse_or("POLL_BACKOFF_FACTOR", POLL_BACKOFF_FACTOR),
                poll_cap_ms: env_parse_or("POLL_CAP_MS", POLL_CAP_MS),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        let env = self.server.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}
