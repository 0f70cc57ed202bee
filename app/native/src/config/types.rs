//! Configuration types for wallfetch.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{APP_ID, DEFAULT_TAGS};
use crate::providers::ProviderId;

/// How the next search tag is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TagStrategy {
    /// Walk the tag list in order, wrapping around at the end.
    #[default]
    Circular,
    /// Pick the tag that has been searched the fewest times.
    LeastUsed,
}

/// How the wallpaper is picked from the destination directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum SelectionMode {
    /// Uniformly random.
    Random,
    /// Biased towards recently downloaded files.
    #[default]
    RecencyWeighted,
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct WallfetchConfig {
    /// Minimum number of hours between two downloading runs.
    pub run_interval_hours: f64,

    /// Days a downloaded image hash is remembered before it may be fetched again.
    pub retention_days: f64,

    /// Search tags, in rotation order.
    pub tags: Vec<String>,

    /// Strategy used to pick the next tag: "circular" or "leastUsed".
    pub tag_strategy: TagStrategy,

    /// Number of concurrent acquisition tasks per run.
    pub images_per_run: usize,

    /// Ignore the run interval and always download.
    pub force_download: bool,

    /// Timeout in seconds applied to every network call.
    pub request_timeout_seconds: f64,

    /// Total attempts per acquisition task, including the first one.
    pub retry_attempts: u32,

    /// Fixed delay in seconds between two attempts.
    pub retry_delay_seconds: f64,

    /// Maximum relative deviation of an image's aspect ratio from the target.
    pub aspect_ratio_tolerance: f64,

    /// Target width in pixels.
    pub target_width: u32,

    /// Target height in pixels.
    pub target_height: u32,

    /// Resize accepted images to the target resolution before saving.
    pub resize: bool,

    /// Enabled providers. A task picks one of them uniformly at random.
    pub providers: Vec<ProviderId>,

    /// Search result pages walked per task before giving up.
    pub max_pages: u32,

    /// Results requested per search page, for providers that support it.
    pub per_page: u32,

    /// Extra text appended to the tag per provider, e.g. `{"unsplash": ",dark"}`.
    pub tag_suffix: HashMap<ProviderId, String>,

    /// Directory downloaded wallpapers are saved to.
    /// Defaults to `~/Pictures/wallfetch`.
    pub wallpaper_directory: String,

    /// Directory holding the ledger, rotation state, last-run marker, and lock.
    /// Defaults to the platform data directory.
    pub state_directory: String,

    /// Path to a `.env` file with provider API keys.
    ///
    /// Supported keys: `PEXELS_API_KEY`, `PIXABAY_API_KEY`,
    /// `UNSPLASH_ACCESS_KEY`, `WALLHAVEN_API_KEY`. Relative paths resolve
    /// against the config file directory.
    pub api_keys: String,

    /// Probe the network once per run and skip the run when offline.
    pub check_internet_connection: bool,

    /// `host:port` used by the connectivity probe.
    pub connectivity_host: String,

    /// Wallpaper selection: "random" or "recencyWeighted".
    pub selection: SelectionMode,

    /// Apply a wallpaper after each run.
    pub apply_after_run: bool,

    /// Fraction of failed tasks at which a run is aborted.
    pub failure_threshold: f64,

    /// Optional log file, appended to in addition to stderr.
    pub log_file: Option<String>,
}

impl Default for WallfetchConfig {
    fn default() -> Self {
        Self {
            run_interval_hours: 23.0,
            retention_days: 30.0,
            tags: DEFAULT_TAGS.iter().map(ToString::to_string).collect(),
            tag_strategy: TagStrategy::default(),
            images_per_run: 2,
            force_download: false,
            request_timeout_seconds: 20.0,
            retry_attempts: 3,
            retry_delay_seconds: 1.0,
            aspect_ratio_tolerance: 0.1,
            target_width: 1920,
            target_height: 1080,
            resize: true,
            providers: ProviderId::ALL.to_vec(),
            max_pages: 4,
            per_page: 15,
            tag_suffix: HashMap::from([(ProviderId::Unsplash, ",dark".to_string())]),
            wallpaper_directory: String::new(),
            state_directory: String::new(),
            api_keys: String::new(),
            check_internet_connection: true,
            connectivity_host: "www.google.com:80".to_string(),
            selection: SelectionMode::default(),
            apply_after_run: true,
            failure_threshold: 0.5,
            log_file: None,
        }
    }
}

impl WallfetchConfig {
    /// Checks the values that would make a run meaningless or unsafe.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first offending option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tags.iter().all(|tag| tag.trim().is_empty()) {
            return Err(ConfigError::Invalid("tags must contain at least one tag".into()));
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::Invalid("retryAttempts must be at least 1".into()));
        }
        if !is_usable_duration(self.retry_delay_seconds) {
            return Err(ConfigError::Invalid(
                "retryDelaySeconds must be a positive, representable number of seconds".into(),
            ));
        }
        if self.images_per_run == 0 {
            return Err(ConfigError::Invalid("imagesPerRun must be at least 1".into()));
        }
        if self.providers.is_empty() {
            return Err(ConfigError::Invalid("providers must name at least one provider".into()));
        }
        if !(self.aspect_ratio_tolerance > 0.0 && self.aspect_ratio_tolerance <= 1.0) {
            return Err(ConfigError::Invalid("aspectRatioTolerance must be within (0, 1]".into()));
        }
        if self.target_width == 0 || self.target_height == 0 {
            return Err(ConfigError::Invalid("targetWidth and targetHeight must be positive".into()));
        }
        if !is_usable_duration(self.request_timeout_seconds) {
            return Err(ConfigError::Invalid(
                "requestTimeoutSeconds must be a positive, representable number of seconds".into(),
            ));
        }
        if !(self.failure_threshold > 0.0 && self.failure_threshold <= 1.0) {
            return Err(ConfigError::Invalid("failureThreshold must be within (0, 1]".into()));
        }
        if self.run_interval_hours < 0.0 || self.retention_days < 0.0 {
            return Err(ConfigError::Invalid(
                "runIntervalHours and retentionDays must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Returns the configured tags with blank entries removed.
    #[must_use]
    pub fn effective_tags(&self) -> Vec<String> {
        self.tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    /// Resolves the wallpaper directory, relative to `base_dir` if needed.
    #[must_use]
    pub fn wallpaper_dir(&self, base_dir: &Path) -> PathBuf {
        if self.wallpaper_directory.trim().is_empty() {
            crate::state::default_wallpaper_dir()
        } else {
            crate::platform::expand_and_resolve(&self.wallpaper_directory, base_dir)
        }
    }

    /// Resolves the state directory, relative to `base_dir` if needed.
    #[must_use]
    pub fn state_dir(&self, base_dir: &Path) -> PathBuf {
        if self.state_directory.trim().is_empty() {
            crate::state::default_state_dir()
        } else {
            crate::platform::expand_and_resolve(&self.state_directory, base_dir)
        }
    }
}

/// True if `seconds` converts to a non-zero [`Duration`] without overflow.
fn is_usable_duration(seconds: f64) -> bool {
    Duration::try_from_secs_f64(seconds).is_ok_and(|duration| !duration.is_zero())
}

/// Errors that can occur when loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error(
        "No configuration file found. Expected at ~/.config/wallfetch/config.jsonc or ~/.wallfetch.jsonc"
    )]
    NotFound,
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),
    /// The configuration parsed but holds unusable values.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Legacy configuration file names in the home directory.
const LEGACY_CONFIG_FILE_NAMES: &[&str] = &[".wallfetch.jsonc", ".wallfetch.json"];

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/wallfetch/config.jsonc` or `config.json`, if set
/// 2. `~/.config/wallfetch/config.jsonc` or `config.json`
/// 3. the platform config directory (`~/Library/Application Support` on macOS)
/// 4. `~/.wallfetch.jsonc` or `~/.wallfetch.json`
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let app_dir = PathBuf::from(xdg_config).join(APP_ID);
        for filename in CONFIG_FILE_NAMES {
            paths.push(app_dir.join(filename));
        }
    }

    if let Some(home) = dirs::home_dir() {
        let app_dir = home.join(".config").join(APP_ID);
        for filename in CONFIG_FILE_NAMES {
            let path = app_dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let app_dir = config_dir.join(APP_ID);
        for filename in CONFIG_FILE_NAMES {
            let path = app_dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    if let Some(home) = dirs::home_dir() {
        for filename in LEGACY_CONFIG_FILE_NAMES {
            paths.push(home.join(filename));
        }
    }

    paths
}

/// Parses a configuration file, stripping JSONC comments first.
///
/// # Errors
///
/// Returns `ConfigError::IoError` if the file cannot be read and
/// `ConfigError::ParseError` if it is not valid JSON.
pub fn load_config_from_path(path: &PathBuf) -> Result<(WallfetchConfig, PathBuf), ConfigError> {
    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: WallfetchConfig = serde_json::from_reader(reader)?;
    Ok((config, path.clone()))
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of
/// the expected locations, or the errors of [`load_config_from_path`].
pub fn load_config() -> Result<(WallfetchConfig, PathBuf), ConfigError> {
    for path in config_paths() {
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    Err(ConfigError::NotFound)
}
