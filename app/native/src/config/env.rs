//! Provider API keys loaded from an environment file.
//!
//! Keys live in a `.env` file referenced by the `apiKeys` option instead of
//! the configuration file itself. A key missing from the file falls back to
//! the process environment, so `PEXELS_API_KEY=… wallfetch run` also works.
//!
//! Uses the `dotenvy` crate for `.env` parsing.

use std::collections::HashMap;
use std::path::Path;

use crate::platform::expand_and_resolve;
use crate::providers::ProviderId;

/// Environment variable names for API keys.
pub mod keys {
    /// Pexels API key, sent as the `Authorization` header.
    pub const PEXELS_API_KEY: &str = "PEXELS_API_KEY";
    /// Pixabay API key, sent as the `key` query parameter.
    pub const PIXABAY_API_KEY: &str = "PIXABAY_API_KEY";
    /// Unsplash access key, sent as `Authorization: Client-ID …`.
    pub const UNSPLASH_ACCESS_KEY: &str = "UNSPLASH_ACCESS_KEY";
    /// Optional Wallhaven key, only needed for NSFW or private collections.
    pub const WALLHAVEN_API_KEY: &str = "WALLHAVEN_API_KEY";
}

/// Parses an environment file and returns a map of key-value pairs.
///
/// Returns an empty map if the file doesn't exist or can't be read; an
/// unreadable file that does exist is logged.
#[must_use]
pub fn parse_env_file(path: &Path) -> HashMap<String, String> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(err) => {
            if path.exists() {
                tracing::warn!(path = %path.display(), error = %err, "failed to read env file");
            }
            HashMap::new()
        }
    }
}

/// Loads provider API keys.
///
/// `api_keys_path` may be empty, relative to `config_dir`, absolute, or
/// start with `~`.
#[must_use]
pub fn load_api_keys(api_keys_path: &str, config_dir: &Path) -> ApiKeys {
    let file_vars = if api_keys_path.trim().is_empty() {
        HashMap::new()
    } else {
        parse_env_file(&expand_and_resolve(api_keys_path, config_dir))
    };

    let lookup = |name: &str| -> Option<String> {
        file_vars
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
            .filter(|value| !value.trim().is_empty())
    };

    ApiKeys {
        pexels: lookup(keys::PEXELS_API_KEY),
        pixabay: lookup(keys::PIXABAY_API_KEY),
        unsplash: lookup(keys::UNSPLASH_ACCESS_KEY),
        wallhaven: lookup(keys::WALLHAVEN_API_KEY),
    }
}

/// Container for provider API keys.
#[derive(Clone, Default)]
pub struct ApiKeys {
    pub pexels: Option<String>,
    pub pixabay: Option<String>,
    pub unsplash: Option<String>,
    pub wallhaven: Option<String>,
}

impl ApiKeys {
    /// Returns the key configured for `provider`, if any.
    #[must_use]
    pub fn for_provider(&self, provider: ProviderId) -> Option<&str> {
        match provider {
            ProviderId::Pexels => self.pexels.as_deref(),
            ProviderId::Pixabay => self.pixabay.as_deref(),
            ProviderId::Unsplash => self.unsplash.as_deref(),
            ProviderId::Wallhaven => self.wallhaven.as_deref(),
        }
    }
}

// Keys never end up in logs or `--debug` output.
impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("pexels", &self.pexels.is_some())
            .field("pixabay", &self.pixabay.is_some())
            .field("unsplash", &self.unsplash.is_some())
            .field("wallhaven", &self.wallhaven.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_parse_env_file_with_comments_and_quotes() {
        let temp_dir = TempDir::new().unwrap();
        let env_path = temp_dir.path().join(".env");

        let mut file = fs::File::create(&env_path).unwrap();
        writeln!(file, "# provider keys").unwrap();
        writeln!(file, "PEXELS_API_KEY=\"abc def\"").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "PIXABAY_API_KEY='123=456'").unwrap();

        let result = parse_env_file(&env_path);
        assert_eq!(result.len(), 2);
        assert_eq!(result.get("PEXELS_API_KEY"), Some(&"abc def".to_string()));
        assert_eq!(result.get("PIXABAY_API_KEY"), Some(&"123=456".to_string()));
    }

    #[test]
    fn test_parse_env_file_nonexistent() {
        let result = parse_env_file(Path::new("/nonexistent/path/.env"));
        assert!(result.is_empty());
    }

    #[test]
    fn test_load_api_keys_resolves_relative_to_config_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("secrets.env"),
            "UNSPLASH_ACCESS_KEY=unsplash-key\nWALLHAVEN_API_KEY=\n",
        )
        .unwrap();

        let keys = load_api_keys("secrets.env", temp_dir.path());
        assert_eq!(keys.for_provider(ProviderId::Unsplash), Some("unsplash-key"));
        // Blank values count as missing.
        assert!(keys.wallhaven.is_none() || std::env::var(keys::WALLHAVEN_API_KEY).is_ok());
    }

    #[test]
    fn test_api_keys_debug_hides_values() {
        let keys = ApiKeys {
            pexels: Some("super-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{keys:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("pexels: true"));
    }
}
