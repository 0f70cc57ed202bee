//! Path utilities for shell-like path expansion and file naming.
//!
//! Config values such as `wallpaperDirectory` or `apiKeys` may use `~` or be
//! relative to the config file, and downloaded images are named after their
//! search tag, which has to be made safe for use as a path component.

use std::path::{Path, PathBuf};

/// Expands shell-like paths (tilde) to absolute paths.
///
/// Absolute and relative paths are returned unchanged; use
/// [`expand_and_resolve`] to anchor relative paths to a base directory.
///
/// # Examples
///
/// ```ignore
/// use wallfetch_lib::platform::path::expand;
///
/// let wallpapers = expand("~/Pictures/wallfetch");
/// assert!(!wallpapers.to_string_lossy().starts_with("~"));
/// ```
#[must_use]
pub fn expand(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return PathBuf::new();
    }

    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}

/// Expands shell-like paths and resolves relative paths against `base_dir`.
///
/// Tilde paths are expanded to the home directory and never joined with
/// `base_dir`. An empty input yields an empty path.
#[must_use]
pub fn expand_and_resolve(path: &str, base_dir: &Path) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return PathBuf::new();
    }

    let expanded = expand(path);

    if expanded.is_absolute() {
        return expanded;
    }

    base_dir.join(expanded)
}

/// Turns a free-form search tag into a lowercase file name component.
///
/// Runs of anything that is not ASCII alphanumeric collapse into a single
/// `-`, so `"northern lights,dark"` becomes `"northern-lights-dark"`. An input
/// without any usable character yields `"untagged"`.
#[must_use]
pub fn sanitize_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if out.is_empty() {
        "untagged".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_empty() {
        assert_eq!(expand(""), PathBuf::new());
        assert_eq!(expand("   "), PathBuf::new());
    }

    #[test]
    fn test_expand_absolute_path() {
        let result = expand("/var/lib/wallfetch");
        assert_eq!(result, PathBuf::from("/var/lib/wallfetch"));
    }

    #[test]
    fn test_expand_tilde_path() {
        let result = expand("~/Pictures/wallfetch");
        assert!(!result.to_string_lossy().starts_with('~'));
        assert!(result.to_string_lossy().ends_with("Pictures/wallfetch"));
    }

    #[test]
    fn test_expand_and_resolve_relative() {
        let base = PathBuf::from("/home/user/.config/wallfetch");
        let result = expand_and_resolve(".env", &base);
        assert_eq!(result, PathBuf::from("/home/user/.config/wallfetch/.env"));
    }

    #[test]
    fn test_expand_and_resolve_absolute_ignores_base() {
        let base = PathBuf::from("/base/dir");
        let result = expand_and_resolve("/srv/wallpapers", &base);
        assert_eq!(result, PathBuf::from("/srv/wallpapers"));
    }

    #[test]
    fn test_expand_and_resolve_tilde_ignores_base() {
        let base = PathBuf::from("/base/dir");
        let result = expand_and_resolve("~/secrets/.env", &base);
        assert!(!result.to_string_lossy().starts_with('~'));
        assert!(!result.to_string_lossy().contains("/base/dir"));
    }

    #[test]
    fn test_expand_and_resolve_whitespace_trimmed() {
        let base = PathBuf::from("/base/dir");
        let result = expand_and_resolve("  wallpapers  ", &base);
        assert_eq!(result, PathBuf::from("/base/dir/wallpapers"));
    }

    #[test]
    fn test_sanitize_component_collapses_separators() {
        assert_eq!(sanitize_component("northern lights,dark"), "northern-lights-dark");
        assert_eq!(sanitize_component("  Fish in  Water "), "fish-in-water");
    }

    #[test]
    fn test_sanitize_component_strips_path_characters() {
        assert_eq!(sanitize_component("../../etc/passwd"), "etc-passwd");
    }

    #[test]
    fn test_sanitize_component_empty_fallback() {
        assert_eq!(sanitize_component(""), "untagged");
        assert_eq!(sanitize_component("%%%"), "untagged");
    }
}
