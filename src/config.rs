use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Server-side configuration
#[derive(Debug, Clone)]
pub struct Config {
    // HTTP
    pub port: u16,

    // Translation provider (OpenAI-compatible chat completions)
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_api_url: String,
    pub provider_timeout: Duration,
    pub provider_max_attempts: u32,

    // Optional durable cache
    pub database_url: Option<String>,

    // Optional key guarding the metrics endpoint
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: parse_env("PORT").unwrap_or(8080),

            openai_api_key: std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?,
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            provider_timeout: Duration::from_secs(parse_env("PROVIDER_TIMEOUT_SECS").unwrap_or(10)),
            provider_max_attempts: parse_env("PROVIDER_MAX_ATTEMPTS").unwrap_or(3),

            database_url: non_empty_env("DATABASE_URL"),
            api_key: non_empty_env("API_KEY"),
        })
    }

    /// Timeout for a single provider HTTP attempt.
    ///
    /// `provider_timeout` bounds the whole call including retries, so each
    /// attempt gets an equal share of it.
    pub fn attempt_timeout(&self) -> Duration {
        self.provider_timeout / self.provider_max_attempts.max(1)
    }
}

/// Client-side configuration (coalescer, preference storage, API endpoint)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the translation API (without the `/api/...` path)
    pub translate_api_url: String,

    /// Window during which requests are collected into one batch
    pub coalesce_window: Duration,

    /// Timeout for one batch request to the API
    pub request_timeout: Duration,

    /// File holding the persisted locale preference
    pub preference_file: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            translate_api_url: std::env::var("TRANSLATE_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            coalesce_window: Duration::from_millis(parse_env("COALESCE_WINDOW_MS").unwrap_or(10)),
            request_timeout: Duration::from_secs(parse_env("CLIENT_TIMEOUT_SECS").unwrap_or(15)),
            preference_file: std::env::var("LOCALE_PREFERENCE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".site-translator/locale.json")),
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
