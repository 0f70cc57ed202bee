//! State directory utilities.
//!
//! Everything wallfetch persists between runs (dedup ledger, tag rotation
//! state, last-run marker, process lock) lives in one directory. By default
//! that is `{data_dir}/wallfetch`, with a fallback to `/tmp/wallfetch` when the
//! platform data directory is unavailable.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;

use crate::constants::APP_ID;

/// Returns the default state directory for the application.
#[must_use]
pub fn default_state_dir() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from(format!("/tmp/{APP_ID}")), |data| data.join(APP_ID))
}

/// Returns the default directory downloaded wallpapers are written to.
#[must_use]
pub fn default_wallpaper_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .map_or_else(|| default_state_dir().join("wallpapers"), |dir| dir.join(APP_ID))
}

/// Replaces `path` with `contents` atomically.
///
/// The data is written to a temporary file in the same directory and renamed
/// over the destination, so readers see either the old or the new content.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the
/// temporary file cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Current time as fractional seconds since the Unix epoch.
///
/// This is the timestamp format of every persisted record.
#[must_use]
pub fn unix_now() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0.0, |elapsed| elapsed.as_secs_f64())
}

/// Calculates the total size of a directory in bytes, recursively.
///
/// A missing directory has size zero.
///
/// # Errors
///
/// Returns an error if a directory entry cannot be read.
pub fn dir_size(path: &Path) -> io::Result<u64> {
    let mut total = 0u64;

    if path.is_dir() {
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                total += dir_size(&path)?;
            } else {
                total += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
    }

    Ok(total)
}

/// Formats a byte count as a human-readable string like "1.50 MB".
#[must_use]
#[allow(clippy::cast_precision_loss)] // Precision loss is acceptable for human-readable output
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}
