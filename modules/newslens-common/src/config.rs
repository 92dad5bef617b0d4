use std::env;
use std::time::Duration;

use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // External providers. Either may be empty: an empty Anthropic key means
    // the heuristic classifier runs instead of the oracle; an empty news key
    // means the source adapter fetches nothing.
    pub anthropic_api_key: String,
    pub news_api_key: String,

    // Pipeline tuning
    pub analysis_ttl_secs: u64,
    pub oracle_timeout_secs: u64,
    pub oracle_batch_cap: usize,
    pub persist_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            news_api_key: env::var("NEWS_API_KEY").unwrap_or_default(),
            analysis_ttl_secs: parsed_env("TOPIC_ANALYSIS_TTL_SECS", 3600),
            oracle_timeout_secs: parsed_env("ORACLE_TIMEOUT_SECS", 30),
            oracle_batch_cap: parsed_env("ORACLE_BATCH_CAP", 20),
            persist_concurrency: parsed_env("PERSIST_CONCURRENCY", 4),
        }
    }

    /// Load a config for offline runs backed by the in-memory store:
    /// no database required, everything else as usual.
    pub fn offline_from_env() -> Self {
        Self {
            database_url: String::new(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            news_api_key: env::var("NEWS_API_KEY").unwrap_or_default(),
            analysis_ttl_secs: parsed_env("TOPIC_ANALYSIS_TTL_SECS", 3600),
            oracle_timeout_secs: parsed_env("ORACLE_TIMEOUT_SECS", 30),
            oracle_batch_cap: parsed_env("ORACLE_BATCH_CAP", 20),
            persist_concurrency: parsed_env("PERSIST_CONCURRENCY", 4),
        }
    }

    pub fn analysis_ttl(&self) -> Duration {
        Duration::from_secs(self.analysis_ttl_secs)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    /// Log the effective configuration without leaking secrets.
    pub fn log_redacted(&self) {
        info!(
            anthropic_key = if self.anthropic_api_key.is_empty() { "absent" } else { "set" },
            news_key = if self.news_api_key.is_empty() { "absent" } else { "set" },
            ttl_secs = self.analysis_ttl_secs,
            oracle_timeout_secs = self.oracle_timeout_secs,
            oracle_batch_cap = self.oracle_batch_cap,
            persist_concurrency = self.persist_concurrency,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number")),
        Err(_) => default,
    }
}
