//! Configuration file loader
//!
//! Priority (low to high):
//! 1. Default values
//! 2. Config file (`--config` or `./.nightly-upload.yaml`)
//! 3. Environment variables

use super::config::*;
use crate::core::error::UploadError;
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Configuration file name looked up in the current directory
pub const CONFIG_FILENAME: &str = ".nightly-upload.yaml";

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Explicit config file. Must exist when given.
    pub config_path: Option<PathBuf>,

    /// Directory searched for `CONFIG_FILENAME` when no explicit path is given
    pub search_dir: PathBuf,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load, merge and validate the configuration
    pub async fn load(options: ConfigLoadOptions) -> Result<UploadConfig, UploadError> {
        let mut config = match &options.config_path {
            Some(path) => Self::load_config_file(path).await?.ok_or_else(|| {
                UploadError::ConfigError(format!("config file not found: {}", path.display()))
            })?,
            None => Self::load_config_file(&options.search_dir.join(CONFIG_FILENAME))
                .await?
                .unwrap_or_default(),
        };

        Self::apply_env(&mut config, &options.env)?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a YAML file; `None` if it does not exist
    async fn load_config_file(file_path: &Path) -> Result<Option<UploadConfig>, UploadError> {
        if !file_path.exists() {
            return Ok(None);
        }

        debug!("loading config from {}", file_path.display());

        let content = fs::read_to_string(file_path).await.map_err(|e| {
            UploadError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: UploadConfig = serde_yaml::from_str(&content).map_err(|e| {
            UploadError::ConfigError(format!("Failed to parse YAML config: {}", e))
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides
    fn apply_env(
        config: &mut UploadConfig,
        env: &HashMap<String, String>,
    ) -> Result<(), UploadError> {
        // NIGHTLY_UPLOAD_TARGET -> upload_target
        if let Some(target) = env.get("NIGHTLY_UPLOAD_TARGET") {
            config.upload_target = target.clone();
        }

        // NIGHTLY_SIGNING_KEY -> signing_key
        if let Some(key) = env.get("NIGHTLY_SIGNING_KEY") {
            config.signing_key = key.clone();
        }

        // NIGHTLY_POLL_INTERVAL_SECS -> poll.interval_secs
        if let Some(interval) = env.get("NIGHTLY_POLL_INTERVAL_SECS") {
            config.poll.interval_secs = interval.parse().map_err(|_| {
                UploadError::ConfigError(format!(
                    "NIGHTLY_POLL_INTERVAL_SECS must be a number of seconds, got '{}'",
                    interval
                ))
            })?;
        }

        // NIGHTLY_FETCHER -> fetcher
        if let Some(fetcher) = env.get("NIGHTLY_FETCHER") {
            config.fetcher = FetcherKind::parse(fetcher).ok_or_else(|| {
                UploadError::ConfigError(format!(
                    "NIGHTLY_FETCHER must be 'wget' or 'http', got '{}'",
                    fetcher
                ))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(dir: &Path) -> ConfigLoadOptions {
        ConfigLoadOptions {
            config_path: None,
            search_dir: dir.to_path_buf(),
            env: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_defaults_without_config_file() {
        let temp_dir = TempDir::new().unwrap();

        let config = ConfigLoader::load(options(temp_dir.path())).await.unwrap();

        assert_eq!(config, UploadConfig::default());
    }

    #[tokio::test]
    async fn test_project_config_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILENAME),
            "distribution: hardy\npackages: [qt]\n",
        )
        .unwrap();

        let config = ConfigLoader::load(options(temp_dir.path())).await.unwrap();

        assert_eq!(config.distribution, "hardy");
        assert_eq!(config.packages, vec!["qt"]);
    }

    #[tokio::test]
    async fn test_explicit_config_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let mut opts = options(temp_dir.path());
        opts.config_path = Some(temp_dir.path().join("missing.yaml"));

        let result = ConfigLoader::load(opts).await;

        assert!(matches!(result, Err(UploadError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nightly.yaml");
        std::fs::write(&path, "upload_target: from-file\n").unwrap();

        let mut opts = options(temp_dir.path());
        opts.config_path = Some(path);
        opts.env
            .insert("NIGHTLY_UPLOAD_TARGET".to_string(), "from-env".to_string());
        opts.env
            .insert("NIGHTLY_POLL_INTERVAL_SECS".to_string(), "5".to_string());
        opts.env.insert("NIGHTLY_FETCHER".to_string(), "http".to_string());

        let config = ConfigLoader::load(opts).await.unwrap();

        assert_eq!(config.upload_target, "from-env");
        assert_eq!(config.poll.interval_secs, 5);
        assert_eq!(config.fetcher, FetcherKind::Http);
    }

    #[tokio::test]
    async fn test_invalid_env_value() {
        let temp_dir = TempDir::new().unwrap();
        let mut opts = options(temp_dir.path());
        opts.env
            .insert("NIGHTLY_POLL_INTERVAL_SECS".to_string(), "soon".to_string());

        let error = ConfigLoader::load(opts).await.unwrap_err();

        assert!(error.to_string().contains("soon"));
    }

    #[tokio::test]
    async fn test_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILENAME), "packages: {oops").unwrap();

        let error = ConfigLoader::load(options(temp_dir.path())).await.unwrap_err();

        assert!(error.to_string().contains("Failed to parse YAML config"));
    }

    #[tokio::test]
    async fn test_loaded_config_is_validated() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILENAME),
            "poll:\n  interval_secs: 0\n",
        )
        .unwrap();

        let result = ConfigLoader::load(options(temp_dir.path())).await;

        assert!(result.is_err());
    }
}
