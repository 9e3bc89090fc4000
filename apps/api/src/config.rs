use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Application configuration loaded from environment variables.
/// Built once at startup and shared read-only afterwards.
#[derive(Clone)]
pub struct Config {
    pub gemini_api_key: String,
    /// Endpoint template; `{model}` is substituted with `gemini_model`.
    pub gemini_endpoint: String,
    pub gemini_model: String,
    pub llm_timeout: Duration,
    pub max_upload_bytes: usize,
    pub session_ttl: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_endpoint: optional_env("GEMINI_ENDPOINT", DEFAULT_GEMINI_ENDPOINT),
            gemini_model: optional_env("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 30)?),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10_000_000)?,
            session_ttl: Duration::from_secs(parse_env("SESSION_TTL_SECS", 3600)?),
            port: parse_env("PORT", 5000)?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

// The API key never reaches log output, even through `{:?}`.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_endpoint", &self.gemini_endpoint)
            .field("gemini_model", &self.gemini_model)
            .field("llm_timeout", &self.llm_timeout)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("session_ttl", &self.session_ttl)
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for unit tests; points the generation endpoint nowhere useful.
    pub fn for_tests() -> Self {
        Config {
            gemini_api_key: "test-key".to_string(),
            gemini_endpoint: "http://127.0.0.1:9/{model}".to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            llm_timeout: Duration::from_secs(5),
            max_upload_bytes: 10_000_000,
            session_ttl: Duration::from_secs(3600),
            port: 0,
            rust_log: "info".to_string(),
        }
    }
}
