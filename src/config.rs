//! Configuration management for the application
use crate::query::RssLocale;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Name reported by the `/health` endpoint
    pub service_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8001, service_name: "newsnexus-api".to_string() }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_seconds: u64,
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_run_migrations() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/newsnexus".to_string(),
            max_connections: 10,
            timeout_seconds: 30,
            run_migrations: default_run_migrations(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging format: "json" or "text"
    pub format: String,
    /// Default log level if no RUST_LOG is set
    pub default_level: String,
    /// Custom filter for dependency logs
    pub dependency_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            default_level: "info".to_string(),
            dependency_filter: Some(
                "hyper=warn,h2=warn,tower=info,tower_http=info,reqwest=warn,rustls=warn,sqlx=warn"
                    .to_string(),
            ),
        }
    }
}

/// Google News RSS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleRssConfig {
    pub hl: String,
    pub gl: String,
    pub ceid: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for GoogleRssConfig {
    fn default() -> Self {
        let locale = RssLocale::default();
        Self {
            hl: locale.hl,
            gl: locale.gl,
            ceid: locale.ceid,
            timeout_seconds: 20,
            user_agent: format!("NewsNexusApi/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GoogleRssConfig {
    pub fn locale(&self) -> RssLocale {
        RssLocale { hl: self.hl.clone(), gl: self.gl.clone(), ceid: self.ceid.clone() }
    }
}

/// External deduplication job queuer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeduperConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for DeduperConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost:8000".to_string(), timeout_seconds: 30 }
    }
}

/// News API (newsapi.org) access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsApiConfig {
    pub base_url: String,
    /// Requests fail until a key is set
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for NewsApiConfig {
    fn default() -> Self {
        Self { base_url: "https://newsapi.org/v2/".to_string(), api_key: None, timeout_seconds: 20 }
    }
}

/// Automated RSS request runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Pause between consecutive RSS requests
    pub request_delay_ms: u64,
    /// Directory holding the query spreadsheets managed through the API
    #[serde(default)]
    pub excel_files_dir: Option<String>,
}

pub const DEFAULT_REQUEST_DELAY_MS: u64 = 5000;
pub const MIN_REQUEST_DELAY_MS: u64 = 500;
pub const MAX_REQUEST_DELAY_MS: u64 = 10_000;

impl Default for AutomationConfig {
    fn default() -> Self {
        Self { request_delay_ms: DEFAULT_REQUEST_DELAY_MS, excel_files_dir: None }
    }
}

impl AutomationConfig {
    /// The configured delay if it is within the allowed range.
    pub fn checked_delay_ms(&self) -> Result<u64, ConfigError> {
        if (MIN_REQUEST_DELAY_MS..=MAX_REQUEST_DELAY_MS).contains(&self.request_delay_ms) {
            Ok(self.request_delay_ms)
        } else {
            Err(ConfigError::InvalidValue(format!(
                "automation.request_delay_ms must be between {} and {}, got {}",
                MIN_REQUEST_DELAY_MS, MAX_REQUEST_DELAY_MS, self.request_delay_ms
            )))
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub google_rss: GoogleRssConfig,
    pub deduper: DeduperConfig,
    #[serde(default)]
    pub news_api: NewsApiConfig,
    pub automation: AutomationConfig,
}

impl Config {
    /// Load configuration from environment variables and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv().ok();

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("NEWSNEXUS_").split("__"));

        // The config file location itself can only come from the environment
        if let Some(config_path) = std::env::var_os("NEWSNEXUS_CONFIG") {
            let path = Path::new(&config_path);
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        figment.extract().map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::MissingConfig("Database URL is required".to_string()));
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue("server.port must be non-zero".to_string()));
        }

        if self.google_rss.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "google_rss.timeout_seconds must be non-zero".to_string(),
            ));
        }

        if self.deduper.base_url.is_empty() {
            return Err(ConfigError::MissingConfig("Deduper base URL is required".to_string()));
        }

        check_http_url("deduper.base_url", &self.deduper.base_url)?;
        check_http_url("news_api.base_url", &self.news_api.base_url)?;

        if self.news_api.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "news_api.timeout_seconds must be non-zero".to_string(),
            ));
        }

        if self.automation.excel_files_dir.as_deref().is_some_and(|dir| dir.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "automation.excel_files_dir must not be empty when set".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ConfigError::InvalidValue(format!("{} must be an http(s) URL, got {}", key, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.google_rss.locale(), RssLocale::default());
        assert_eq!(config.automation.checked_delay_ms().unwrap(), DEFAULT_REQUEST_DELAY_MS);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.database.url.clear();
        assert!(matches!(config.validate(), Err(ConfigError::MissingConfig(_))));

        let mut config = Config::default();
        config.deduper.base_url = "ftp://queuer".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let mut config = Config::default();
        config.google_rss.timeout_seconds = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let mut config = Config::default();
        config.news_api.base_url = "newsapi.org".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let mut config = Config::default();
        config.automation.excel_files_dir = Some(" ".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_request_delay_bounds() {
        for (delay, ok) in [(499, false), (500, true), (10_000, true), (10_001, false)] {
            let automation = AutomationConfig { request_delay_ms: delay, ..Default::default() };
            assert_eq!(automation.checked_delay_ms().is_ok(), ok, "delay {}", delay);
        }
    }

    #[test]
    fn test_toml_and_env_layering() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "newsnexus.toml",
                r#"
                [server]
                port = 9100

                [google_rss]
                hl = "fr"
                "#,
            )?;
            jail.set_env("NEWSNEXUS_CONFIG", "newsnexus.toml");
            jail.set_env("NEWSNEXUS_DEDUPER__BASE_URL", "http://queuer:5000");
            jail.set_env("NEWSNEXUS_NEWS_API__API_KEY", "news-key");
            jail.set_env("NEWSNEXUS_AUTOMATION__EXCEL_FILES_DIR", "/srv/automation");

            let config = Config::load().map_err(|e| e.to_string())?;
            assert_eq!(config.server.port, 9100);
            assert_eq!(config.google_rss.hl, "fr");
            assert_eq!(config.google_rss.gl, "US");
            assert_eq!(config.deduper.base_url, "http://queuer:5000");
            assert_eq!(config.news_api.api_key.as_deref(), Some("news-key"));
            assert_eq!(config.news_api.base_url, "https://newsapi.org/v2/");
            assert_eq!(config.automation.excel_files_dir.as_deref(), Some("/srv/automation"));
            Ok(())
        });
    }
}
