//! Configuration module for the feed store.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{AppError, AppResult};

/// Default recency window used by the persistence synchronizer.
pub const DEFAULT_PERSIST_WINDOW_SECS: u64 = 10;
/// Default timeout for feed downloads.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file holding the durable project records
    pub db_path: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,
    /// Projects touched within this window are rewritten on every change
    pub persist_window: Duration,
    /// Upper bound for a single feed download
    pub fetch_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/feedstore.sqlite"),
            log_level: "info".to_string(),
            log_json: false,
            persist_window: Duration::from_secs(DEFAULT_PERSIST_WINDOW_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let db_path = env::var("FEEDSTORE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let log_level = env::var("FEEDSTORE_LOG_LEVEL").unwrap_or(defaults.log_level);

        let log_json = match env::var("FEEDSTORE_LOG_FORMAT") {
            Ok(format) => match format.trim().to_ascii_lowercase().as_str() {
                "json" => true,
                "text" | "" => false,
                other => {
                    return Err(AppError::Config(format!(
                        "Invalid FEEDSTORE_LOG_FORMAT value `{}`; expected text|json",
                        other
                    )))
                }
            },
            Err(_) => defaults.log_json,
        };

        let persist_window = secs_from_env("FEEDSTORE_PERSIST_WINDOW_SECS")?
            .unwrap_or(defaults.persist_window);

        let fetch_timeout =
            secs_from_env("FEEDSTORE_FETCH_TIMEOUT_SECS")?.unwrap_or(defaults.fetch_timeout);

        Ok(Self {
            db_path,
            log_level,
            log_json,
            persist_window,
            fetch_timeout,
        })
    }
}

fn secs_from_env(name: &str) -> AppResult<Option<Duration>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|e| AppError::Config(format!("Invalid {} value `{}`: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test, since every case mutates process-wide env vars.
    #[test]
    fn test_config_from_env() {
        env::remove_var("FEEDSTORE_DB_PATH");
        env::remove_var("FEEDSTORE_LOG_LEVEL");
        env::remove_var("FEEDSTORE_LOG_FORMAT");
        env::remove_var("FEEDSTORE_PERSIST_WINDOW_SECS");
        env::remove_var("FEEDSTORE_FETCH_TIMEOUT_SECS");

        let config = Config::from_env().unwrap();
        assert_eq!(config.db_path, PathBuf::from("./data/feedstore.sqlite"));
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.persist_window, Duration::from_secs(10));
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));

        env::set_var("FEEDSTORE_PERSIST_WINDOW_SECS", "25");
        let config = Config::from_env().unwrap();
        assert_eq!(config.persist_window, Duration::from_secs(25));

        env::set_var("FEEDSTORE_PERSIST_WINDOW_SECS", "ten");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        env::remove_var("FEEDSTORE_PERSIST_WINDOW_SECS");

        env::set_var("FEEDSTORE_LOG_FORMAT", "JSON");
        assert!(Config::from_env().unwrap().log_json);
        env::set_var("FEEDSTORE_LOG_FORMAT", "xml");
        assert!(Config::from_env().is_err());
        env::remove_var("FEEDSTORE_LOG_FORMAT");
    }
}
