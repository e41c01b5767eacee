use anyhow::{Context, Result};

use crate::generation::session::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_TOKENS};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Default total token budget for a generation session.
    pub max_tokens: u64,
    /// Default per-round token request.
    pub chunk_size: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        Ok(Config {
            anthropic_api_key: require("ANTHROPIC_API_KEY")?,
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            max_tokens: positive(lookup("MARGIN_MAX_TOKENS"), DEFAULT_MAX_TOKENS)
                .context("MARGIN_MAX_TOKENS must be a positive integer")?,
            chunk_size: positive(lookup("MARGIN_CHUNK_SIZE"), DEFAULT_CHUNK_SIZE)
                .context("MARGIN_CHUNK_SIZE must be a positive integer")?,
        })
    }
}

fn positive(raw: Option<String>, default: u64) -> Result<u64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value = raw.trim().parse::<u64>()?;
    anyhow::ensure!(value > 0, "got 0");
    Ok(value)
}
