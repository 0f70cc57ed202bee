//! Shared fixtures for the integration suite.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbImage};
pub use tempfile::TempDir;
use wallfetch_lib::config::WallfetchConfig;
pub use wallfetch_lib::orchestrator::{Orchestrator, RunOptions, RunSettings, RunStatus, TaskOutcome};
pub use wallfetch_lib::providers::{ImageProvider, ProviderError, ProviderId, ProviderRegistry};

/// Encodes a solid 16:9 PNG; `shade` keeps the bytes of different images apart.
pub fn png(shade: u8) -> Vec<u8> {
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 36, image::Rgb([shade, shade, shade])))
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

/// A provider answering from a fixed query -> URLs table.
///
/// Queries listed in `failing` answer every search with a timeout. With
/// `downloads_time_out` set, every download does.
pub struct Scripted {
    id: ProviderId,
    results: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    downloads_time_out: bool,
    pub searches: AtomicU32,
    pub fetches: AtomicU32,
}

impl Scripted {
    pub fn new(id: ProviderId) -> Self {
        Self {
            id,
            results: HashMap::new(),
            failing: HashSet::new(),
            downloads_time_out: false,
            searches: AtomicU32::new(0),
            fetches: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn serve(mut self, query: &str, urls: &[&str]) -> Self {
        self.results.insert(query.to_string(), urls.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn fail(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    #[must_use]
    pub const fn time_out_downloads(mut self) -> Self {
        self.downloads_time_out = true;
        self
    }

    pub fn fetch_count(&self) -> u32 { self.fetches.load(Ordering::SeqCst) }
}

#[async_trait]
impl ImageProvider for Scripted {
    fn id(&self) -> ProviderId { self.id }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<String>, ProviderError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(query) {
            return Err(ProviderError::Timeout);
        }
        if page > 1 {
            return Ok(Vec::new());
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.downloads_time_out {
            return Err(ProviderError::Timeout);
        }
        let shade = url.bytes().fold(0u8, u8::wrapping_add);
        Ok(png(shade))
    }
}

/// Run settings for 64x36 targets with no resizing and no network probe.
pub fn settings(tags: &[&str], images_per_run: usize) -> RunSettings {
    let config = WallfetchConfig {
        tags: tags.iter().map(ToString::to_string).collect(),
        images_per_run,
        resize: false,
        target_width: 64,
        target_height: 36,
        retry_attempts: 2,
        retry_delay_seconds: 0.001,
        check_internet_connection: false,
        ..WallfetchConfig::default()
    };
    RunSettings::from_config(&config)
}

pub fn orchestrator(temp: &TempDir, settings: RunSettings, provider: Arc<dyn ImageProvider>) -> Orchestrator {
    let mut registry = ProviderRegistry::new();
    registry.insert(provider);
    Orchestrator::new(settings, registry, wallpaper_dir(temp), &state_dir(temp)).unwrap()
}

pub fn wallpaper_dir(temp: &TempDir) -> std::path::PathBuf { temp.path().join("wallpapers") }

pub fn state_dir(temp: &TempDir) -> std::path::PathBuf { temp.path().join("state") }

/// Number of regular files directly inside `dir`.
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map_or(0, |entries| entries.flatten().filter(|e| e.path().is_file()).count())
}
