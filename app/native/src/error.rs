//! Error types for wallfetch.
//!
//! Each component reports its own error enum. They all convert into
//! [`WallfetchError`], which is what the command line surface returns.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::ledger::LedgerError;
use crate::lock::LockError;
use crate::providers::ProviderError;
use crate::retry::RetryConfigError;
use crate::rotation::RotationError;
use crate::wallpaper::WallpaperError;

/// Errors that can end a wallfetch command.
#[derive(Debug, Error)]
pub enum WallfetchError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Retry settings are unusable.
    #[error("Configuration error: {0}")]
    Retry(#[from] RetryConfigError),
    /// Tag rotation failed.
    #[error("Configuration error: {0}")]
    Rotation(#[from] RotationError),
    /// The dedup ledger could not be read or written.
    #[error("{0}")]
    Ledger(#[from] LedgerError),
    /// The process lock could not be taken.
    #[error("{0}")]
    Lock(#[from] LockError),
    /// Setting up providers failed.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    /// No provider is usable.
    #[error("No image provider is available; add API keys or enable wallhaven")]
    NoProviders,
    /// Applying a wallpaper failed.
    #[error("Wallpaper error: {0}")]
    Wallpaper(#[from] WallpaperError),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Generic command error.
    #[error("{0}")]
    Command(String),
}

impl WallfetchError {
    /// Whether this error only means another instance is already running.
    #[must_use]
    pub const fn is_lock_contention(&self) -> bool {
        matches!(self, Self::Lock(LockError::Contended { .. }))
    }
}

impl From<String> for WallfetchError {
    fn from(msg: String) -> Self { Self::Command(msg) }
}

impl From<&str> for WallfetchError {
    fn from(msg: &str) -> Self { Self::Command(msg.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err: WallfetchError = ConfigError::Invalid("tags must not be empty".to_string()).into();
        let msg = err.to_string();
        assert!(msg.contains("Configuration error"));
        assert!(msg.contains("tags must not be empty"));
    }

    #[test]
    fn test_retry_config_error_is_configuration_error() {
        let err: WallfetchError = RetryConfigError::ZeroAttempts.into();
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_empty_tags_is_configuration_error() {
        let err: WallfetchError = RotationError::EmptyTags.into();
        assert_eq!(err.to_string(), "Configuration error: Tag list is empty");
    }

    #[test]
    fn test_lock_contention_detection() {
        let err: WallfetchError = LockError::Contended { pid: 42 }.into();
        assert!(err.is_lock_contention());
        assert!(err.to_string().contains("42"));

        let io_err: WallfetchError = io::Error::other("disk gone").into();
        assert!(!io_err.is_lock_contention());
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
        let err: WallfetchError = io_err.into();
        assert!(matches!(err, WallfetchError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_command_error_display() {
        let err: WallfetchError = "Generic failure".into();
        assert_eq!(err.to_string(), "Generic failure");
    }

    #[test]
    fn test_error_is_debug() {
        let err = WallfetchError::NoProviders;
        assert!(format!("{err:?}").contains("NoProviders"));
    }
}
