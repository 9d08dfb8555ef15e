// src/config.rs
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use crate::errors::{GraderError, Result};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Application configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the evaluation backend.
    pub backend_url: String,
    /// Delay between two job status polls.
    pub poll_interval: Duration,
    /// Address the dashboard listens on.
    pub bind: String,
    pub request_timeout: Duration,
}

/// Optional file layer, every key may be omitted.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct FileConfig {
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub bind: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            bind: DEFAULT_BIND.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl FileConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }
}

impl AppConfig {
    /// Load configuration from environment variables, layered over the TOML
    /// file named by `GRADER_CONFIG` when it is set.
    pub fn from_env() -> Result<Self> {
        let file = match std::env::var("GRADER_CONFIG") {
            Ok(path) => FileConfig::load(path)?,
            Err(_) => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge the file layer with a variable lookup; variables win.
    pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup("GRADER_BACKEND_URL")
            .or(file.backend_url)
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let backend_url = backend_url.trim().trim_end_matches('/').to_string();
        if backend_url.is_empty() {
            return Err(GraderError::Config("GRADER_BACKEND_URL must not be empty".to_string()));
        }
        reqwest::Url::parse(&backend_url).map_err(|e| {
            GraderError::Config(format!("Invalid backend URL '{}': {}", backend_url, e))
        })?;

        let poll_interval_ms = match lookup("GRADER_POLL_INTERVAL_MS") {
            Some(raw) => parse_number("GRADER_POLL_INTERVAL_MS", &raw)?,
            None => file.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        };
        if poll_interval_ms == 0 {
            return Err(GraderError::Config("Poll interval must be greater than zero".to_string()));
        }

        let request_timeout_secs = match lookup("GRADER_REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse_number("GRADER_REQUEST_TIMEOUT_SECS", &raw)?,
            None => file.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let bind = lookup("GRADER_BIND")
            .or(file.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        Ok(AppConfig {
            backend_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            bind,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| GraderError::Config(format!("{} must be a whole number, got '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = AppConfig::resolve(FileConfig::default(), lookup_from(&[])).unwrap();
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_env_overrides_file() {
        let file = FileConfig::from_toml(
            r#"
            backend_url = "http://grader.internal:9000/"
            poll_interval_ms = 500
            bind = "0.0.0.0:9090"
            "#,
        )
        .unwrap();

        let config = AppConfig::resolve(
            file,
            lookup_from(&[("GRADER_BACKEND_URL", "https://api.example.org/")]),
        )
        .unwrap();

        assert_eq!(config.backend_url, "https://api.example.org");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.bind, "0.0.0.0:9090");
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = AppConfig::resolve(
            FileConfig::default(),
            lookup_from(&[("GRADER_POLL_INTERVAL_MS", "soon")]),
        )
        .unwrap_err();
        assert!(matches!(err, GraderError::Config(_)));

        let err = AppConfig::resolve(
            FileConfig::default(),
            lookup_from(&[("GRADER_POLL_INTERVAL_MS", "0")]),
        )
        .unwrap_err();
        assert!(matches!(err, GraderError::Config(_)));

        let err = AppConfig::resolve(
            FileConfig::default(),
            lookup_from(&[("GRADER_BACKEND_URL", "not a url")]),
        )
        .unwrap_err();
        assert!(matches!(err, GraderError::Config(_)));
    }

    #[test]
    fn test_malformed_toml_is_reported() {
        let err = FileConfig::from_toml("poll_interval_ms = \"fast\"").unwrap_err();
        assert!(matches!(err, GraderError::TomlParse(_)));
    }
}
