//! Fetch-and-filter pipeline.
//!
//! Turns one candidate URL into either a saved wallpaper or a skip. Skips are
//! the normal outcome for most candidates: duplicates, empty bodies, images
//! with the wrong shape, and downloads that keep failing are all logged and
//! passed over. Only failures to write the accepted image are errors.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use thiserror::Error;

use crate::ledger::{DedupLedger, content_hash};
use crate::platform::sanitize_component;
use crate::providers::{ImageProvider, ProviderError};
use crate::retry::RetryPolicy;
use crate::state::{unix_now, write_atomic};

/// JPEG quality used for resized wallpapers.
const JPEG_QUALITY: u8 = 92;

/// Characters of the content hash kept in file names.
const HASH_PREFIX_LEN: usize = 16;

/// Errors that abort processing of a candidate.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Decoding or re-encoding an accepted image failed.
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),
    /// Writing the image to the destination directory failed.
    #[error("failed to save {path}: {source}")]
    Save {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The blocking image worker panicked or was cancelled.
    #[error("image worker failed: {0}")]
    Worker(String),
}

/// Why a candidate was passed over.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The URL hash is already in the ledger.
    Duplicate,
    /// The download returned no bytes.
    Empty,
    /// The bytes are not a decodable image.
    Unreadable,
    /// The aspect ratio is too far from the target.
    AspectRatio { width: u32, height: u32, deviation: f64 },
    /// The download failed with a permanent error.
    FetchFailed(String),
    /// The download kept failing with transient errors until the retries ran out.
    Unreachable(String),
    /// The search returned no candidates at all.
    NoResults,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate => f.write_str("already downloaded"),
            Self::Empty => f.write_str("empty response body"),
            Self::Unreadable => f.write_str("not a readable image"),
            Self::AspectRatio { width, height, deviation } => {
                write!(f, "{width}x{height} deviates {:.1}% from target aspect", deviation * 100.0)
            }
            Self::FetchFailed(err) => write!(f, "download failed: {err}"),
            Self::Unreachable(err) => write!(f, "download kept failing: {err}"),
            Self::NoResults => f.write_str("no search results"),
        }
    }
}

/// Result of processing one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Saved(PathBuf),
    Skipped(SkipReason),
}

/// Which images are acceptable and how they are stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptancePolicy {
    pub target_width: u32,
    pub target_height: u32,
    /// Maximum relative deviation from the target aspect ratio.
    pub tolerance: f64,
    /// Cover-scale and crop accepted images to the target size.
    pub resize: bool,
}

impl AcceptancePolicy {
    /// Relative deviation of `width`x`height` from the target aspect ratio.
    #[must_use]
    pub fn deviation(&self, width: u32, height: u32) -> f64 {
        if width == 0 || height == 0 || self.target_width == 0 || self.target_height == 0 {
            return f64::INFINITY;
        }
        let actual = f64::from(width) / f64::from(height);
        let target = f64::from(self.target_width) / f64::from(self.target_height);
        (actual / target - 1.0).abs()
    }

    #[must_use]
    pub fn accepts(&self, width: u32, height: u32) -> bool {
        self.deviation(width, height) <= self.tolerance
    }
}

/// Downloads, validates, deduplicates, and stores candidate images.
#[derive(Debug)]
pub struct FetchFilter {
    ledger: Arc<DedupLedger>,
    destination: PathBuf,
    policy: AcceptancePolicy,
    retry: RetryPolicy,
}

impl FetchFilter {
    #[must_use]
    pub const fn new(
        ledger: Arc<DedupLedger>,
        destination: PathBuf,
        policy: AcceptancePolicy,
        retry: RetryPolicy,
    ) -> Self {
        Self { ledger, destination, policy, retry }
    }

    #[must_use]
    pub fn destination(&self) -> &Path { &self.destination }

    /// Processes one candidate URL found by `provider` for `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error only if an accepted image cannot be written. The
    /// ledger entry for that image is withdrawn so a later run may retry it.
    pub async fn process(
        &self,
        provider: &dyn ImageProvider,
        url: &str,
        tag: &str,
    ) -> Result<FetchOutcome, PipelineError> {
        let hash = content_hash(url);
        if self.ledger.exists(&hash) {
            tracing::debug!(url, "skipping known image");
            return Ok(FetchOutcome::Skipped(SkipReason::Duplicate));
        }

        let bytes = match self
            .retry
            .run_if(|| provider.fetch(url), ProviderError::is_transient)
            .await
        {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(provider = %provider.id(), url, error = %err, "download failed");
                let reason = if err.last.is_transient() {
                    SkipReason::Unreachable(err.last.to_string())
                } else {
                    SkipReason::FetchFailed(err.last.to_string())
                };
                return Ok(FetchOutcome::Skipped(reason));
            }
        };

        if bytes.is_empty() {
            tracing::warn!(provider = %provider.id(), url, "empty response body");
            return Ok(FetchOutcome::Skipped(SkipReason::Empty));
        }

        let Some((format, width, height)) = probe(&bytes) else {
            tracing::warn!(provider = %provider.id(), url, "response is not a readable image");
            return Ok(FetchOutcome::Skipped(SkipReason::Unreadable));
        };

        let deviation = self.policy.deviation(width, height);
        if deviation > self.policy.tolerance {
            tracing::info!(url, width, height, deviation, "rejected by aspect ratio");
            return Ok(FetchOutcome::Skipped(SkipReason::AspectRatio { width, height, deviation }));
        }

        // Another task may have claimed this hash while we were downloading.
        if !self.ledger.record_if_new(&hash, unix_now()) {
            return Ok(FetchOutcome::Skipped(SkipReason::Duplicate));
        }

        let needs_resize =
            self.policy.resize && (width, height) != (self.policy.target_width, self.policy.target_height);
        let extension = if needs_resize { "jpg" } else { extension_for(format) };
        let stem = format!(
            "{}_{}_{}",
            sanitize_component(tag),
            provider.id(),
            &hash[..HASH_PREFIX_LEN]
        );
        let path = self.destination.join(format!("{stem}.{extension}"));

        let policy = self.policy;
        let target = path.clone();
        let saved = tokio::task::spawn_blocking(move || {
            store(&bytes, &target, needs_resize.then_some((policy.target_width, policy.target_height)))
        })
        .await
        .map_err(|err| PipelineError::Worker(err.to_string()))
        .and_then(|result| result);

        if let Err(err) = saved {
            if let Err(forget_err) = self.ledger.forget(&hash) {
                tracing::warn!(error = %forget_err, "failed to withdraw ledger entry");
            }
            return Err(err);
        }

        tracing::info!(provider = %provider.id(), tag, path = %path.display(), "saved wallpaper");
        Ok(FetchOutcome::Saved(path))
    }
}

/// Detects the format and dimensions without decoding pixel data.
fn probe(bytes: &[u8]) -> Option<(ImageFormat, u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format().ok()?;
    let format = reader.format()?;
    let (width, height) = reader.into_dimensions().ok()?;
    Some((format, width, height))
}

fn extension_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpg",
        other => other.extensions_str().first().copied().unwrap_or("img"),
    }
}

/// Writes `bytes` to `path`, optionally cover-resized to `target` as JPEG.
fn store(bytes: &[u8], path: &Path, target: Option<(u32, u32)>) -> Result<(), PipelineError> {
    let contents = match target {
        None => bytes.to_vec(),
        Some((width, height)) => {
            let img = image::load_from_memory(bytes)?;
            let resized = cover(&img, width, height);
            let mut encoded = Vec::new();
            let encoder = JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY);
            resized.to_rgb8().write_with_encoder(encoder)?;
            encoded
        }
    };

    write_atomic(path, &contents)
        .map_err(|source| PipelineError::Save { path: path.display().to_string(), source })
}

/// Scales `img` to fill `width`x`height` and center-crops the overflow.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cover(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (src_width, src_height) = img.dimensions();
    let scale = (f64::from(width) / f64::from(src_width)).max(f64::from(height) / f64::from(src_height));

    let scaled_width = ((f64::from(src_width) * scale).round() as u32).max(width);
    let scaled_height = ((f64::from(src_height) * scale).round() as u32).max(height);
    let scaled = img.resize_exact(scaled_width, scaled_height, FilterType::CatmullRom);

    let x = (scaled_width - width) / 2;
    let y = (scaled_height - height) / 2;
    scaled.crop_imm(x, y, width, height)
}
