//! Dedup ledger of downloaded content hashes.
//!
//! Maps a content hash to the epoch seconds it was first seen. The whole
//! ledger is held in memory behind a mutex and mirrored to a newline-delimited
//! `hash:timestamp` file: inserts append a single line, eviction rewrites the
//! file in full.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::state::write_atomic;

/// Errors that can occur while loading or rewriting the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger file could not be read or written.
    #[error("Ledger I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Computes the content hash used as ledger key for a candidate URL.
///
/// The URL identifies an image independently of how it gets re-encoded, so
/// its SHA-256 digest is a stable identity.
#[must_use]
pub fn content_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    format!("{digest:x}")
}

/// Persisted set of content hashes with their first-seen timestamps.
#[derive(Debug)]
pub struct DedupLedger {
    path: Option<PathBuf>,
    records: Mutex<HashMap<String, f64>>,
}

impl DedupLedger {
    /// Creates a ledger that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the ledger stored at `path`.
    ///
    /// A missing file is an empty ledger. Malformed lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let records = match fs::read_to_string(path) {
            Ok(contents) => parse_records(&contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(source) => {
                return Err(LedgerError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        tracing::debug!(path = %path.display(), records = records.len(), "dedup ledger loaded");

        Ok(Self {
            path: Some(path.to_path_buf()),
            records: Mutex::new(records),
        })
    }

    /// Replaces the in-memory records with the current contents of the
    /// backing file, picking up records written by another process.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn reload(&self) -> Result<(), LedgerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let fresh = Self::open(path)?;
        *self.records.lock() = fresh.records.into_inner();
        Ok(())
    }

    /// Returns whether `hash` has been recorded.
    #[must_use]
    pub fn exists(&self, hash: &str) -> bool { self.records.lock().contains_key(hash) }

    /// Records `hash` if it is not present yet and returns whether it was new.
    ///
    /// The check and the insert happen under one lock, so of two callers
    /// racing on the same hash exactly one is told it is new. The insert is
    /// visible to every later call immediately; a failed append to the backing
    /// file is logged and does not undo the in-memory insert.
    pub fn record_if_new(&self, hash: &str, now: f64) -> bool {
        let mut records = self.records.lock();
        if records.contains_key(hash) {
            return false;
        }
        records.insert(hash.to_string(), now);

        if let Some(path) = &self.path
            && let Err(err) = append_record(path, hash, now)
        {
            tracing::warn!(path = %path.display(), error = %err, "failed to persist ledger record");
        }

        true
    }

    /// Removes `hash` again, rewriting the backing file.
    ///
    /// Used when an image was recorded but could not be saved, so a later run
    /// may retry it. Returns whether the hash was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be rewritten.
    pub fn forget(&self, hash: &str) -> Result<bool, LedgerError> {
        let mut records = self.records.lock();
        if records.remove(hash).is_none() {
            return Ok(false);
        }
        self.rewrite(&records)?;
        Ok(true)
    }

    /// Evicts every record with `now - first_seen > max_age_seconds` and
    /// rewrites the backing file with the survivors.
    ///
    /// Returns the number of evicted records.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be rewritten.
    pub fn evict_older_than(&self, now: f64, max_age_seconds: f64) -> Result<usize, LedgerError> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, first_seen| now - *first_seen <= max_age_seconds);
        let evicted = before - records.len();

        self.rewrite(&records)?;

        if evicted > 0 {
            tracing::info!(evicted, remaining = records.len(), "evicted expired ledger records");
        }
        Ok(evicted)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize { self.records.lock().len() }

    /// Whether the ledger has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.records.lock().is_empty() }

    /// First-seen timestamp of `hash`, if recorded.
    #[must_use]
    pub fn first_seen(&self, hash: &str) -> Option<f64> { self.records.lock().get(hash).copied() }

    fn rewrite(&self, records: &HashMap<String, f64>) -> Result<(), LedgerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut contents = String::with_capacity(records.len() * 82);
        for (hash, first_seen) in records {
            contents.push_str(&format_record(hash, *first_seen));
        }

        write_atomic(path, contents.as_bytes()).map_err(|source| LedgerError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

fn format_record(hash: &str, first_seen: f64) -> String { format!("{hash}:{first_seen}\n") }

fn append_record(path: &Path, hash: &str, now: f64) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(format_record(hash, now).as_bytes())
}

/// Parses `hash:timestamp` lines, skipping anything malformed.
///
/// When a hash appears twice the earliest timestamp wins.
fn parse_records(contents: &str) -> HashMap<String, f64> {
    let mut records = HashMap::new();
    let mut skipped = 0usize;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parsed = line.rsplit_once(':').and_then(|(hash, ts)| {
            let hash = hash.trim();
            let ts = ts.trim().parse::<f64>().ok().filter(|ts| ts.is_finite())?;
            (!hash.is_empty()).then_some((hash, ts))
        });

        match parsed {
            Some((hash, ts)) => {
                records
                    .entry(hash.to_string())
                    .and_modify(|existing: &mut f64| *existing = existing.min(ts))
                    .or_insert(ts);
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, "skipped malformed ledger lines");
    }

    records
}
