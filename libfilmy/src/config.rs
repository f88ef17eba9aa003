//! Configuration management for Filmy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Environment variable that overrides `api.base_url`
pub const API_URL_ENV: &str = "FILMY_API_URL";

/// Environment variable that points at an explicit config file
pub const CONFIG_PATH_ENV: &str = "FILMY_CONFIG";

const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_STORAGE_PATH: &str = "~/.local/share/filmy/state.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reviews: ReviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Per-request timeout. Requests wait indefinitely when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default)]
    pub failure_policy: ReviewFailurePolicy,
}

/// What happens to an optimistic local review when its submission fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewFailurePolicy {
    /// Leave the review in place, marked as failed
    #[default]
    Keep,
    /// Remove the review from local state
    Rollback,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_STORAGE_PATH.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        let mut config = Self::load_from_path(&config_path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load_or_default() -> Result<Self> {
        let config_path = resolve_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default_config()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout_secs: None,
            },
            storage: StorageConfig::default(),
            reviews: ReviewConfig::default(),
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingField("api.base_url".to_string()).into());
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                value: base_url.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("filmy").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
            [api]
            base_url = "https://filmy.example.com/api"
            timeout_secs = 15

            [storage]
            path = "/tmp/filmy/state.db"

            [reviews]
            failure_policy = "rollback"
            "#,
        );

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.api.base_url, "https://filmy.example.com/api");
        assert_eq!(config.api.timeout_secs, Some(15));
        assert_eq!(config.storage.path, "/tmp/filmy/state.db");
        assert_eq!(config.reviews.failure_policy, ReviewFailurePolicy::Rollback);
    }

    #[test]
    fn test_optional_sections_default() {
        let file = write_config(
            r#"
            [api]
            base_url = "http://localhost:5000/api"
            "#,
        );

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.api.timeout_secs, None);
        assert_eq!(config.storage.path, DEFAULT_STORAGE_PATH);
        assert_eq!(config.reviews.failure_policy, ReviewFailurePolicy::Keep);
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let file = write_config(
            r#"
            [api]
            base_url = "ftp://movies"
            "#,
        );

        let err = Config::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("api.base_url"));
    }

    #[test]
    fn test_rejects_unknown_policy() {
        let file = write_config(
            r#"
            [api]
            base_url = "http://localhost"

            [reviews]
            failure_policy = "retry"
            "#,
        );

        assert!(Config::load_from_path(file.path()).is_err());
    }

    #[test]
    #[serial]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var(CONFIG_PATH_ENV, dir.path().join("missing.toml"));
        std::env::remove_var(API_URL_ENV);

        let config = Config::load_or_default().unwrap();
        std::env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    #[serial]
    fn test_env_overrides_base_url() {
        let file = write_config(
            r#"
            [api]
            base_url = "http://localhost:5000/api"
            "#,
        );
        std::env::set_var(CONFIG_PATH_ENV, file.path());
        std::env::set_var(API_URL_ENV, "http://10.0.0.2:8080");

        let config = Config::load().unwrap();
        std::env::remove_var(CONFIG_PATH_ENV);
        std::env::remove_var(API_URL_ENV);

        assert_eq!(config.api.base_url, "http://10.0.0.2:8080");
    }

    #[test]
    #[serial]
    fn test_env_override_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var(CONFIG_PATH_ENV, dir.path().join("missing.toml"));
        std::env::set_var(API_URL_ENV, "ftp://movies");

        let result = Config::load_or_default();
        std::env::remove_var(CONFIG_PATH_ENV);
        std::env::remove_var(API_URL_ENV);

        let err = result.unwrap_err();
        assert!(err.to_string().contains("api.base_url"));
    }
}
