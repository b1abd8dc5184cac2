//! CLI configuration
//!
//! Layered with the `config` crate: built-in defaults, then the TOML file
//! (explicit `--config` path, or `config.toml` in the platform config
//! directory when present), then `CAMPUSKART_`-prefixed environment
//! variables such as `CAMPUSKART_API__BASE_URL`.

use anyhow::Result;
use campuskart_core::FileTokenStore;
use campuskart_http::DEFAULT_BASE_URL;
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "CAMPUSKART";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Root of the REST API, including the `/api` prefix
    pub base_url: String,

    /// Per-request timeout in seconds (0 disables it)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// JSON file holding the cached access and refresh tokens
    pub token_file: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_file: FileTokenStore::default_path()
                .unwrap_or_else(|| PathBuf::from("campuskart-session.json")),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Default location of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("app", "CampusKart", "campuskart")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl CliConfig {
    /// Load configuration from defaults, file and process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`CliConfig::load`], reading variables from `env` instead of the
    /// process environment when given
    fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        match path {
            Some(path) => builder = builder.add_source(File::from(path).required(true)),
            None => {
                if let Some(default_path) = default_config_path() {
                    builder = builder.add_source(File::from(default_path).required(false));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.api.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"https://campuskart.example.com/api\"\ntimeout_secs = 0\n",
        )
        .unwrap();

        let config = CliConfig::load_with_env(Some(&path), Some(HashMap::new())).unwrap();

        assert_eq!(config.api.base_url, "https://campuskart.example.com/api");
        assert_eq!(config.api.timeout(), None);
        assert_eq!(
            config.session.token_file,
            SessionConfig::default().token_file
        );
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\nbase_url = \"https://file.example.com/api\"\n").unwrap();

        let env = HashMap::from([
            (
                "CAMPUSKART_API__BASE_URL".to_string(),
                "https://env.example.com/api".to_string(),
            ),
            (
                "CAMPUSKART_SESSION__TOKEN_FILE".to_string(),
                "/tmp/ck-session.json".to_string(),
            ),
        ]);
        let config = CliConfig::load_with_env(Some(&path), Some(env)).unwrap();

        assert_eq!(config.api.base_url, "https://env.example.com/api");
        assert_eq!(config.session.token_file, PathBuf::from("/tmp/ck-session.json"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result =
            CliConfig::load_with_env(Some(&dir.path().join("absent.toml")), Some(HashMap::new()));
        assert!(result.is_err());
    }
}
