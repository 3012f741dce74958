//! Typed application configuration, loaded from the environment (§10).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,

    /// Path to the append-only event log (§4.C).
    #[serde(default = "default_event_log_path")]
    pub event_log_path: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Bounded submission inbox capacity (§4.D); also the engine's
    /// backpressure point under load.
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,

    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,

    #[serde(default = "default_snapshot_depth")]
    pub snapshot_depth: usize,
}

fn default_event_log_path() -> String {
    "events.ndjson".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_inbox_capacity() -> usize {
    1024
}

fn default_snapshot_interval_ms() -> u64 {
    2000
}

fn default_snapshot_depth() -> usize {
    10
}

impl AppConfig {
    /// Loads configuration from `MATCHBOOK_`-prefixed environment variables
    /// (`.env`, already loaded by the caller via `dotenvy`, counts as
    /// environment).
    pub fn load() -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("MATCHBOOK").try_parsing(true))
            .build()?;

        cfg.try_deserialize()
    }
}
