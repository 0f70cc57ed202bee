//! Configuration template generation.
//!
//! Generates a commented configuration template with all available options.

use std::fs;
use std::path::Path;

/// Generates a configuration template with all options commented out.
///
/// The commented values are the built-in defaults, so an unedited template
/// behaves exactly like having no configuration file.
#[must_use]
pub fn generate_config_template() -> String {
    r#"// wallfetch Configuration File
// ============================
// This file uses JSONC format (JSON with comments).
// All options below are commented out and show their default values.
// Uncomment and modify the options you want to configure.

{
  // ============================================================================
  // Scheduling
  // ============================================================================
  // Minimum hours between two downloading runs (ignored with --force)
  // "runIntervalHours": 23,
  //
  // Always download, regardless of the run interval
  // "forceDownload": false,
  //
  // Number of images fetched concurrently per run
  // "imagesPerRun": 2,
  //
  // A run is aborted (and not recorded) when this fraction of tasks fails
  // "failureThreshold": 0.5,

  // ============================================================================
  // Tags
  // ============================================================================
  // Search tags, in rotation order
  // "tags": ["nature", "sky", "mountain", "sunset", "forest"],
  //
  // "circular" walks the list in order, "leastUsed" picks the least searched tag
  // "tagStrategy": "circular",

  // ============================================================================
  // Providers
  // ============================================================================
  // Enabled providers: "pexels", "pixabay", "unsplash", "wallhaven"
  // "providers": ["pexels", "pixabay", "unsplash", "wallhaven"],
  //
  // Path to a .env file with PEXELS_API_KEY, PIXABAY_API_KEY,
  // UNSPLASH_ACCESS_KEY and (optionally) WALLHAVEN_API_KEY
  // "apiKeys": "",
  //
  // Text appended to the tag for a specific provider
  // "tagSuffix": { "unsplash": ",dark" },
  //
  // Search pages walked per task and results requested per page
  // "maxPages": 4,
  // "perPage": 15,

  // ============================================================================
  // Network
  // ============================================================================
  // "requestTimeoutSeconds": 20,
  // "retryAttempts": 3,
  // "retryDelaySeconds": 1,
  // "checkInternetConnection": true,
  // "connectivityHost": "www.google.com:80",

  // ============================================================================
  // Images
  // ============================================================================
  // "targetWidth": 1920,
  // "targetHeight": 1080,
  //
  // Maximum relative deviation from the target aspect ratio (0.1 = 10%)
  // "aspectRatioTolerance": 0.1,
  //
  // Resize accepted images to the target resolution
  // "resize": true,
  //
  // Days a downloaded image is remembered to avoid downloading it again
  // "retentionDays": 30,

  // ============================================================================
  // Storage
  // ============================================================================
  // Where wallpapers are saved (default: ~/Pictures/wallfetch)
  // "wallpaperDirectory": "",
  //
  // Where the ledger, tag state, last-run marker and lock live
  // (default: platform data directory)
  // "stateDirectory": "",
  //
  // Also append logs to this file
  // "logFile": null,

  // ============================================================================
  // Wallpaper
  // ============================================================================
  // "random" or "recencyWeighted"
  // "selection": "recencyWeighted",
  //
  // Set a new wallpaper after every run
  // "applyAfterRun": true
}
"#
    .to_string()
}

/// Creates a configuration file with the template at the specified path.
///
/// Creates parent directories if they don't exist.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn create_config_file(path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, generate_config_template())
}

#[cfg(test)]
mod tests {
    use super::super::types::WallfetchConfig;
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let template = generate_config_template();
        let reader = json_comments::StripComments::new(template.as_bytes());
        let parsed: WallfetchConfig = serde_json::from_reader(reader).unwrap();
        let defaults = WallfetchConfig::default();

        assert_eq!(parsed.tags, defaults.tags);
        assert_eq!(parsed.images_per_run, defaults.images_per_run);
    }

    #[test]
    fn test_template_mentions_every_section() {
        let template = generate_config_template();
        for key in [
            "runIntervalHours",
            "tagStrategy",
            "providers",
            "apiKeys",
            "retryAttempts",
            "aspectRatioTolerance",
            "retentionDays",
            "wallpaperDirectory",
            "selection",
        ] {
            assert!(template.contains(key), "template should mention {key}");
        }
    }

    #[test]
    fn test_create_config_file_creates_parents() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("wallfetch").join("config.jsonc");
        create_config_file(&path).unwrap();
        assert!(path.exists());
    }
}
