//! Configuration module for wallfetch.
//!
//! This module provides configuration types, loading, validation, the
//! commented template, and `.env` secrets.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

pub mod env;
pub mod template;
pub mod types;

use std::path::{Path, PathBuf};

pub use env::{ApiKeys, load_api_keys};
pub use types::{
    ConfigError, SelectionMode, TagStrategy, WallfetchConfig, config_paths, load_config,
    load_config_from_path,
};

/// A validated configuration together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The parsed configuration.
    pub config: WallfetchConfig,
    /// The file it was read from, if any.
    pub path: Option<PathBuf>,
}

impl LoadedConfig {
    /// Directory relative paths in the configuration resolve against.
    ///
    /// This is the config file's directory, or the current directory when
    /// running on defaults.
    #[must_use]
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolved wallpaper destination directory.
    #[must_use]
    pub fn wallpaper_dir(&self) -> PathBuf { self.config.wallpaper_dir(&self.base_dir()) }

    /// Resolved state directory.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf { self.config.state_dir(&self.base_dir()) }

    /// Provider API keys from the configured `.env` file and the environment.
    #[must_use]
    pub fn api_keys(&self) -> ApiKeys { load_api_keys(&self.config.api_keys, &self.base_dir()) }
}

/// Loads and validates the configuration.
///
/// `custom_path` (from `--config`) takes precedence over the search paths.
/// When no file exists anywhere, a commented template is written to the
/// preferred location and the defaults are used.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if validation
/// fails. A missing custom path is reported as `ConfigError::NotFound`.
pub fn load(custom_path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let result = match custom_path {
        Some(path) if !path.exists() => return Err(ConfigError::NotFound),
        Some(path) => load_config_from_path(&path.to_path_buf()),
        None => load_config(),
    };

    let loaded = match result {
        Ok((config, path)) => LoadedConfig { config, path: Some(path) },
        Err(ConfigError::NotFound) => {
            let path = create_default_config_file();
            LoadedConfig { config: WallfetchConfig::default(), path }
        }
        Err(err) => return Err(err),
    };

    loaded.config.validate()?;
    Ok(loaded)
}

/// Creates a template configuration file at the preferred location.
///
/// Returns the path on success. Failure is not fatal since the defaults are
/// usable without a file.
fn create_default_config_file() -> Option<PathBuf> {
    let Some(config_path) = config_paths().into_iter().next() else {
        tracing::debug!("no config path available for creating template");
        return None;
    };

    if config_path.exists() {
        return None;
    }

    match template::create_config_file(&config_path) {
        Ok(()) => {
            tracing::info!(path = %config_path.display(), "created default configuration file");
            Some(config_path)
        }
        Err(err) => {
            tracing::debug!(
                error = %err,
                path = %config_path.display(),
                "failed to create default configuration file"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_load_custom_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.jsonc");
        fs::write(&path, r#"{ "tags": ["sky"], "wallpaperDirectory": "walls" }"#).unwrap();

        let loaded = load(Some(&path)).unwrap();
        assert_eq!(loaded.config.tags, vec!["sky"]);
        assert_eq!(loaded.base_dir(), temp.path());
        assert_eq!(loaded.wallpaper_dir(), temp.path().join("walls"));
    }

    #[test]
    fn test_load_missing_custom_path_is_not_found() {
        let result = load(Some(Path::new("/nonexistent/wallfetch/config.jsonc")));
        assert!(matches!(result, Err(ConfigError::NotFound)));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "tags": [] }"#).unwrap();

        let result = load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
