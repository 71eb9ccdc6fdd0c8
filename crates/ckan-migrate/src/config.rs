//! Configuration types for ckan-migrate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::RetryConfig;

/// Config file used when none is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "ckan_migration_config.json";

/// Keys that must be present in every configuration file.
pub const REQUIRED_KEYS: [&str; 4] = ["source_url", "source_api_key", "target_url", "target_api_key"];

/// Template shown to the operator when the configuration cannot be loaded.
pub const EXAMPLE_CONFIG: &str = r#"{
  "source_url": "http://source-ckan-url",
  "source_api_key": "your-source-api-key",
  "target_url": "http://target-ckan-url",
  "target_api_key": "your-target-api-key"
}"#;

/// Main migration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Base URL of the source catalog.
    pub source_url: String,
    /// API key sent to the source catalog.
    pub source_api_key: String,
    /// Base URL of the target catalog.
    pub target_url: String,
    /// API key sent to the target catalog.
    pub target_api_key: String,
    /// Working directory for staged metadata, payloads and the org mapping.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Pause after each organization and dataset, in seconds.
    #[serde(default = "default_item_delay_secs")]
    pub item_delay_secs: u64,
    /// Total calls per API request before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed delay between attempts, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("ckan_migration")
}

fn default_item_delay_secs() -> u64 {
    1
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    60
}

impl MigrationConfig {
    /// Creates a config with the four required values and default tuning.
    pub fn new(
        source_url: impl Into<String>,
        source_api_key: impl Into<String>,
        target_url: impl Into<String>,
        target_api_key: impl Into<String>,
    ) -> Self {
        let mut config = Self {
            source_url: source_url.into(),
            source_api_key: source_api_key.into(),
            target_url: target_url.into(),
            target_api_key: target_api_key.into(),
            work_dir: default_work_dir(),
            item_delay_secs: default_item_delay_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            timeout_secs: default_timeout_secs(),
        };
        config.normalize();
        config
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a JSON object,
    /// or lacks any of [`REQUIRED_KEYS`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKeys`] naming every absent required key.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(content)?;
        let object = raw
            .as_object()
            .ok_or_else(|| Error::Config("configuration must be a JSON object".to_string()))?;

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| !object.contains_key(**key))
            .map(|key| (*key).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingKeys(missing));
        }

        let mut config: Self = serde_json::from_value(raw)?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        let trimmed = self.source_url.trim_end_matches('/').len();
        self.source_url.truncate(trimmed);
        let trimmed = self.target_url.trim_end_matches('/').len();
        self.target_url.truncate(trimmed);
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        validate_url("source_url", &self.source_url)?;
        validate_url("target_url", &self.target_url)?;
        if self.max_attempts == 0 {
            return Err(Error::Config(
                "max_attempts must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Retry policy for API calls.
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::fixed(self.max_attempts, Duration::from_secs(self.retry_delay_secs))
    }

    /// Pause applied after each organization and dataset.
    #[must_use]
    pub fn item_delay(&self) -> Duration {
        Duration::from_secs(self.item_delay_secs)
    }

    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn validate_url(key: &str, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "{key} must be an http(s) URL, got '{url}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = MigrationConfig::new("http://a", "k1", "http://b", "k2");
        assert_eq!(config.work_dir, PathBuf::from("ckan_migration"));
        assert_eq!(config.item_delay(), Duration::from_secs(1));
        assert_eq!(config.retry_config().max_attempts(), 3);
        assert_eq!(config.retry_config().delay, Duration::from_secs(5));
    }

    #[test]
    fn test_config_json_parse() {
        let json = r#"{
            "source_url": "http://old.example.org/",
            "source_api_key": "src",
            "target_url": "https://new.example.org//",
            "target_api_key": "tgt",
            "item_delay_secs": 0
        }"#;
        let config = MigrationConfig::from_json_str(json).unwrap();
        assert_eq!(config.source_url, "http://old.example.org");
        assert_eq!(config.target_url, "https://new.example.org");
        assert_eq!(config.item_delay_secs, 0);
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_missing_target_api_key_is_named_exactly() {
        let json = r#"{
            "source_url": "http://a",
            "source_api_key": "src",
            "target_url": "http://b"
        }"#;
        match MigrationConfig::from_json_str(json) {
            Err(Error::MissingKeys(keys)) => assert_eq!(keys, vec!["target_api_key".to_string()]),
            other => panic!("expected MissingKeys, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_keys_keep_declaration_order() {
        match MigrationConfig::from_json_str(r#"{"target_url": "http://b"}"#) {
            Err(Error::MissingKeys(keys)) => {
                assert_eq!(keys, vec!["source_url", "source_api_key", "target_api_key"]);
            }
            other => panic!("expected MissingKeys, got {other:?}"),
        }
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            MigrationConfig::from_json_str("[1, 2]"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE_CONFIG.as_bytes()).unwrap();

        let config = MigrationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.source_api_key, "your-source-api-key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = MigrationConfig::from_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let config = MigrationConfig::new("ftp://a", "k1", "http://b", "k2");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = MigrationConfig::new("http://a", "k1", "http://b", "k2");
        config.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
