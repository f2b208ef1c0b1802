//! Application configuration.

use coinwatch_engine::SchedulerConfig;
use coinwatch_feeds::SourceEndpoints;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scheduler timing and threshold.
    pub scheduler: SchedulerConfig,
    /// Upstream price and fiat rate APIs.
    pub sources: SourceEndpoints,
    /// SQLite URL for the subscription store.
    pub database_url: String,
    /// Telegram bot token. Usually supplied through the environment.
    pub telegram_bot_token: Option<String>,
    /// On-demand lookups per day for free users.
    pub free_daily_lookups: u32,
    /// Logging level.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            sources: SourceEndpoints::default(),
            database_url: "sqlite://coinwatch.db".to_string(),
            telegram_bot_token: None,
            free_daily_lookups: 5,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: display,
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: display,
            source,
        })
    }

    /// Override secrets and endpoints from environment variables.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|value| !value.trim().is_empty());

        if let Some(token) = var("TELEGRAM_BOT_TOKEN") {
            self.telegram_bot_token = Some(token);
        }
        if let Some(key) = var("COINMARKETCAP_API_KEY") {
            self.sources.coinmarketcap_api_key = Some(key);
        }
        if let Some(url) = var("COINBASE_BASE_URL") {
            self.sources.coinbase_url = url;
        }
        if let Some(url) = var("COINMARKETCAP_URL") {
            self.sources.coinmarketcap_url = url;
        }
        if let Some(url) = var("BINANCE_URL") {
            self.sources.binance_url = url;
        }
        if let Some(url) = var("COINGECKO_URL") {
            self.sources.coingecko_url = url;
        }
        if let Some(url) = var("UZS_RATE_URL") {
            self.sources.uzs_rate_url = Some(url);
        }
        if let Some(url) = var("RUB_RATE_URL") {
            self.sources.rub_rate_url = Some(url);
        }
        if let Some(url) = var("DATABASE_URL") {
            self.database_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.scheduler.tick_period_secs, 20);
        assert_eq!(config.free_daily_lookups, 5);
        assert_eq!(config.telegram_bot_token, None);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("coinwatch-does-not-exist.json");
        assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let path = std::env::temp_dir().join(format!("coinwatch-config-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"scheduler": {"failure_backoff_secs": 120}, "free_daily_lookups": 3}"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.scheduler.failure_backoff_secs, 120);
        assert_eq!(config.scheduler.tick_period_secs, 20);
        assert_eq!(config.free_daily_lookups, 3);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_invalid_file() {
        let path = std::env::temp_dir().join(format!("coinwatch-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{not json").unwrap();

        let result = AppConfig::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(ConfigError::Json { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("COINMARKETCAP_API_KEY", "cmc-key"),
            ("BINANCE_URL", "http://localhost:9000/price"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("COINGECKO_URL", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.telegram_bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.sources.coinmarketcap_api_key.as_deref(), Some("cmc-key"));
        assert_eq!(config.sources.binance_url, "http://localhost:9000/price");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(
            config.sources.coingecko_url,
            SourceEndpoints::default().coingecko_url
        );
    }
}
