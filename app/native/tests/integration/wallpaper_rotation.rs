//! Applying a wallpaper from what a run downloaded.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wallfetch_lib::config::SelectionMode;
use wallfetch_lib::wallpaper::{WallpaperError, WallpaperSetter, apply_from_directory};

use crate::common::*;

#[derive(Default)]
struct Recorder(RefCell<Vec<PathBuf>>);

impl WallpaperSetter for Recorder {
    fn apply(&self, path: &Path) -> Result<(), WallpaperError> {
        self.0.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

#[tokio::test]
async fn test_applies_a_downloaded_image() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(Scripted::new(ProviderId::Pexels).serve("sky", &["https://img.test/sky.png"]));
    let mut orch = orchestrator(&temp, settings(&["sky"], 1), provider);
    let report = orch.run(RunOptions::default()).await.unwrap();
    let saved = report.saved()[0].to_path_buf();

    // Zero-byte leftovers are swept before choosing.
    fs::write(wallpaper_dir(&temp).join("broken.jpg"), b"").unwrap();

    let recorder = Recorder::default();
    let applied = apply_from_directory(&wallpaper_dir(&temp), SelectionMode::RecencyWeighted, &recorder).unwrap();

    assert_eq!(applied.as_deref(), Some(saved.as_path()));
    assert_eq!(recorder.0.borrow().as_slice(), &[saved]);
    assert!(!wallpaper_dir(&temp).join("broken.jpg").exists());
}

#[test]
fn test_empty_directory_applies_nothing() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(wallpaper_dir(&temp)).unwrap();

    let recorder = Recorder::default();
    let applied = apply_from_directory(&wallpaper_dir(&temp), SelectionMode::Random, &recorder).unwrap();

    assert!(applied.is_none());
    assert!(recorder.0.borrow().is_empty());
}
