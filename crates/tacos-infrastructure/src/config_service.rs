//! Adapter configuration loading.
//!
//! Reads `~/.config/tacos/config.toml` when it exists, falls back to
//! defaults otherwise, then applies environment overrides.

use crate::paths::TacosPaths;
use crate::storage::AtomicTomlFile;
use std::path::{Path, PathBuf};
use tacos_core::config::AdapterConfig;
use tacos_core::{Result, TacosError};

pub const ENV_BASE_URL: &str = "TACOS_BASE_URL";
pub const ENV_DATA_DIR: &str = "TACOS_DATA_DIR";

pub struct ConfigService;

impl ConfigService {
    /// Loads the configuration from the default location.
    pub fn load() -> Result<AdapterConfig> {
        Self::load_from(&TacosPaths::config_file()?)
    }

    /// Loads the configuration from `path`, or defaults when it is missing.
    pub fn load_from(path: &Path) -> Result<AdapterConfig> {
        let file = AtomicTomlFile::<AdapterConfig>::new(path.to_path_buf());
        let config = match file.load()? {
            Some(config) => {
                tracing::debug!("Loaded adapter config from {}", path.display());
                config
            }
            None => {
                tracing::debug!("No config at {}, using defaults", path.display());
                AdapterConfig::default()
            }
        };

        let config = Self::apply_overrides(config, |key| std::env::var(key).ok());
        Self::validate(&config)?;
        Ok(config)
    }

    /// Applies `TACOS_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(mut config: AdapterConfig, lookup: F) -> AdapterConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url;
        }
        if let Some(data_dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            config.data_dir = Some(PathBuf::from(data_dir));
        }
        config
    }

    /// Resolves the data directory: configured value or platform default.
    pub fn data_dir(config: &AdapterConfig) -> Result<PathBuf> {
        match &config.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => TacosPaths::data_dir(),
        }
    }

    fn validate(config: &AdapterConfig) -> Result<()> {
        let base = config.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(TacosError::config(format!(
                "base_url must be an http(s) URL, got '{}'",
                config.base_url
            )));
        }
        if !config.token_path.starts_with('/') {
            return Err(TacosError::config(format!(
                "token_path must start with '/', got '{}'",
                config.token_path
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigService::load_from(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config.token_path, "/index.php?content=livraison");
    }

    #[test]
    fn test_file_values_are_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"http://127.0.0.1:9000\"\nmax_redirects = 2\n").unwrap();

        let config = ConfigService::load_from(&path).unwrap();
        assert_eq!(config.max_redirects, 2);
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"ftp://example\"\n").unwrap();

        let err = ConfigService::load_from(&path).unwrap_err();
        assert!(matches!(err, TacosError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, "http://localhost:8080"),
            (ENV_DATA_DIR, "/var/lib/tacos"),
        ]
        .into_iter()
        .collect();

        let config = ConfigService::apply_overrides(AdapterConfig::default(), |key| {
            env.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/tacos")));
    }
}
