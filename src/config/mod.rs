//! Configuration module for the reviewer service.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    File,
}

/// Errors raised while reading the configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DB_URL is required")]
    MissingDbUrl,
    #[error("invalid PORT {0:?}")]
    InvalidPort(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// sqlx SQLite connection string, e.g. `sqlite:./data/app.sqlite`
    pub db_url: String,
    /// HTTP listen port
    pub port: u16,
    /// Log level (debug, info, warn, error)
    pub log_level: String,
    pub log_output: LogOutput,
    /// Log file used when `log_output` is `File`
    pub log_file_path: PathBuf,
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_url = lookup("DB_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingDbUrl)?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => 8080,
        };

        let log_level = match lookup("LOG_LEVEL").map(|v| v.to_lowercase()) {
            Some(level) if matches!(level.as_str(), "debug" | "info" | "warn" | "error") => level,
            _ => "info".to_string(),
        };

        let log_output = match lookup("LOG_OUTPUT").as_deref() {
            Some("file") => LogOutput::File,
            _ => LogOutput::Stdout,
        };

        let log_file_path = lookup("LOG_FILE_PATH")
            .unwrap_or_else(|| "./app.log".to_string())
            .into();

        Ok(Self {
            db_url,
            port,
            log_level,
            log_output,
            log_file_path,
        })
    }

    /// Address the HTTP server binds to.
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = config(&[("DB_URL", "sqlite:./data/app.sqlite")]).unwrap();

        assert_eq!(config.db_url, "sqlite:./data/app.sqlite");
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_output, LogOutput::Stdout);
        assert_eq!(config.log_file_path, PathBuf::from("./app.log"));
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_full_config() {
        let config = config(&[
            ("DB_URL", "sqlite::memory:"),
            ("PORT", "9000"),
            ("LOG_LEVEL", "DEBUG"),
            ("LOG_OUTPUT", "file"),
            ("LOG_FILE_PATH", "/var/log/reviewers.log"),
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_output, LogOutput::File);
        assert_eq!(config.log_file_path, PathBuf::from("/var/log/reviewers.log"));
    }

    #[test]
    fn test_missing_db_url() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::MissingDbUrl);
        assert_eq!(
            config(&[("DB_URL", "  ")]).unwrap_err(),
            ConfigError::MissingDbUrl
        );
    }

    #[test]
    fn test_invalid_port() {
        let err = config(&[("DB_URL", "sqlite:x"), ("PORT", "http")]).unwrap_err();
        assert_eq!(err, ConfigError::InvalidPort("http".to_string()));

        let err = config(&[("DB_URL", "sqlite:x"), ("PORT", "70000")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_)));
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let config = config(&[
            ("DB_URL", "sqlite:x"),
            ("LOG_LEVEL", "verbose"),
            ("LOG_OUTPUT", "syslog"),
        ])
        .unwrap();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_output, LogOutput::Stdout);
    }
}
