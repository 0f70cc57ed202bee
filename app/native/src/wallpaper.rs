//! Choosing and applying a wallpaper from the destination directory.
//!
//! Runs after acquisition, outside the concurrent part of a run. Zero-byte
//! leftovers are swept first, then one image is chosen either uniformly at
//! random or weighted towards recently downloaded files, and handed to the
//! desktop.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use natord::compare;
use rand::Rng;
use rand::seq::IndexedRandom;
use thiserror::Error;

use crate::config::SelectionMode;

/// Supported image file extensions.
const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Share of the cumulative weight below which the recency draw never lands.
const RECENCY_FLOOR: f64 = 0.6;

/// Errors that can occur when applying a wallpaper.
#[derive(Debug, Error)]
pub enum WallpaperError {
    /// The wallpaper file does not exist.
    #[error("Wallpaper file not found: {0}")]
    FileNotFound(String),
    /// The desktop refused the wallpaper.
    #[error("Failed to set wallpaper: {0}")]
    SetWallpaperFailed(String),
}

/// Anything that can put an image on the desktop.
pub trait WallpaperSetter {
    /// # Errors
    ///
    /// Returns an error if the wallpaper could not be applied.
    fn apply(&self, path: &Path) -> Result<(), WallpaperError>;
}

/// Sets the wallpaper through the desktop environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopSetter;

impl WallpaperSetter for DesktopSetter {
    fn apply(&self, path: &Path) -> Result<(), WallpaperError> {
        if !path.exists() {
            return Err(WallpaperError::FileNotFound(path.display().to_string()));
        }

        wallpaper::set_from_path(&path.display().to_string())
            .map_err(|e| WallpaperError::SetWallpaperFailed(e.to_string()))
    }
}

/// Checks if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Lists all supported image files in a directory, in natural order.
#[must_use]
pub fn list_images(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut images: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_supported_image(path))
        .collect();

    images.sort_by(|a, b| compare(a.to_string_lossy().as_ref(), b.to_string_lossy().as_ref()));
    images
}

/// Deletes zero-byte files in `dir` and returns how many were removed.
///
/// Interrupted downloads from older versions can leave these behind.
pub fn sweep_empty_files(dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let empty = entry.metadata().is_ok_and(|meta| meta.is_file() && meta.len() == 0);
        if !empty {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "removed empty file");
                removed += 1;
            }
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "failed to remove empty file"),
        }
    }
    removed
}

/// Picks one entry of `(path, modified_seconds)` according to `mode`.
#[must_use]
pub fn choose<'a, R: Rng>(
    entries: &'a [(PathBuf, f64)],
    mode: SelectionMode,
    rng: &mut R,
) -> Option<&'a Path> {
    match mode {
        SelectionMode::Random => entries.choose(rng).map(|(path, _)| path.as_path()),
        SelectionMode::RecencyWeighted => recency_weighted(entries, rng),
    }
}

/// Weights files by modification time normalised to `[0, 1]` (oldest 0,
/// newest 1), draws uniformly from the top 40% of the cumulative weight, and
/// returns the first file whose running sum reaches the draw.
fn recency_weighted<'a, R: Rng>(entries: &'a [(PathBuf, f64)], rng: &mut R) -> Option<&'a Path> {
    let oldest = entries.iter().map(|(_, mtime)| *mtime).reduce(f64::min)?;
    let newest = entries.iter().map(|(_, mtime)| *mtime).reduce(f64::max)?;
    let span = newest - oldest;

    if span <= 0.0 {
        return entries.choose(rng).map(|(path, _)| path.as_path());
    }

    let weights: Vec<f64> = entries.iter().map(|(_, mtime)| (mtime - oldest) / span).collect();
    let total: f64 = weights.iter().sum();
    let draw = rng.random_range(RECENCY_FLOOR * total..=total);

    let mut cumulative = 0.0;
    for ((path, _), weight) in entries.iter().zip(&weights) {
        cumulative += weight;
        if draw <= cumulative {
            return Some(path.as_path());
        }
    }

    // Rounding can leave the draw a hair above the final sum.
    entries.last().map(|(path, _)| path.as_path())
}

fn modified_seconds(path: &Path) -> f64 {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map_or(0.0, |elapsed| elapsed.as_secs_f64())
}

/// Sweeps `dir`, chooses an image, and applies it with `setter`.
///
/// Returns the applied path, or `None` when the directory has no images.
///
/// # Errors
///
/// Returns an error if the chosen image cannot be applied.
pub fn apply_from_directory(
    dir: &Path,
    mode: SelectionMode,
    setter: &dyn WallpaperSetter,
) -> Result<Option<PathBuf>, WallpaperError> {
    sweep_empty_files(dir);

    let entries: Vec<(PathBuf, f64)> = list_images(dir)
        .into_iter()
        .map(|path| {
            let mtime = modified_seconds(&path);
            (path, mtime)
        })
        .collect();

    let Some(chosen) = choose(&entries, mode, &mut rand::rng()) else {
        tracing::warn!(dir = %dir.display(), "no images found in wallpaper directory");
        return Ok(None);
    };

    tracing::info!(path = %chosen.display(), "setting wallpaper");
    setter.apply(chosen)?;
    Ok(Some(chosen.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    use super::*;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<PathBuf>>);

    impl WallpaperSetter for Recorder {
        fn apply(&self, path: &Path) -> Result<(), WallpaperError> {
            self.0.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    fn entries(mtimes: &[(&str, f64)]) -> Vec<(PathBuf, f64)> {
        mtimes.iter().map(|(name, mtime)| (PathBuf::from(name), *mtime)).collect()
    }

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(Path::new("a.jpg")));
        assert!(is_supported_image(Path::new("a.WEBP")));
        assert!(!is_supported_image(Path::new("a.gif")));
        assert!(!is_supported_image(Path::new("jpg")));
    }

    #[test]
    fn test_list_images_natural_order() {
        let temp = TempDir::new().unwrap();
        for name in ["img10.jpg", "img2.png", "notes.txt", "img1.jpeg"] {
            fs::write(temp.path().join(name), b"x").unwrap();
        }

        let names: Vec<String> = list_images(temp.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["img1.jpeg", "img2.png", "img10.jpg"]);
    }

    #[test]
    fn test_list_images_missing_dir_is_empty() {
        assert!(list_images(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn test_sweep_removes_only_empty_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("empty.jpg"), b"").unwrap();
        fs::write(temp.path().join("full.jpg"), b"data").unwrap();

        assert_eq!(sweep_empty_files(temp.path()), 1);
        assert!(!temp.path().join("empty.jpg").exists());
        assert!(temp.path().join("full.jpg").exists());
    }

    #[test]
    fn test_recency_weighted_favours_newest() {
        let list = entries(&[("old.jpg", 100.0), ("mid.jpg", 150.0), ("new.jpg", 200.0)]);

        // Weights are 0, 0.5, 1; every draw in [0.9, 1.5] lands on the newest.
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let chosen = choose(&list, SelectionMode::RecencyWeighted, &mut rng).unwrap();
            assert_eq!(chosen, Path::new("new.jpg"));
        }
    }

    #[test]
    fn test_recency_weighted_equal_mtimes_is_uniform() {
        let list = entries(&[("a.jpg", 5.0), ("b.jpg", 5.0)]);
        let mut rng = StdRng::seed_from_u64(7);

        let chosen = choose(&list, SelectionMode::RecencyWeighted, &mut rng).unwrap();
        assert!(chosen == Path::new("a.jpg") || chosen == Path::new("b.jpg"));
    }

    #[test]
    fn test_choose_empty_is_none() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(choose(&[], SelectionMode::Random, &mut rng).is_none());
        assert!(choose(&[], SelectionMode::RecencyWeighted, &mut rng).is_none());
    }

    #[test]
    fn test_apply_from_directory_uses_setter() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("only.jpg"), b"data").unwrap();
        fs::write(temp.path().join("broken.jpg"), b"").unwrap();
        let setter = Recorder::default();

        let applied = apply_from_directory(temp.path(), SelectionMode::Random, &setter).unwrap();

        assert_eq!(applied, Some(temp.path().join("only.jpg")));
        assert_eq!(setter.0.borrow().as_slice(), [temp.path().join("only.jpg")]);
        assert!(!temp.path().join("broken.jpg").exists());
    }

    #[test]
    fn test_apply_from_empty_directory_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let setter = Recorder::default();

        let applied = apply_from_directory(temp.path(), SelectionMode::RecencyWeighted, &setter).unwrap();

        assert!(applied.is_none());
        assert!(setter.0.borrow().is_empty());
    }
}
