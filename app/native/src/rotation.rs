//! Tag rotation strategies.
//!
//! A rotator hands out the tag each acquisition task searches for. Two
//! strategies exist behind the [`TagSelector`] capability: a circular cursor
//! over the tag list and a least-used counter per tag. Both persist their
//! state after every selection so rotation continues across runs.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::config::TagStrategy;
use crate::constants::files;
use crate::state::write_atomic;

/// Errors produced by a tag rotator.
#[derive(Debug, Error)]
pub enum RotationError {
    /// There is no tag to hand out.
    #[error("Tag list is empty")]
    EmptyTags,
}

/// Snapshot of a rotator's persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "camelCase")]
pub enum RotationState {
    /// Position of the next tag in the list.
    Circular { index: usize },
    /// Times each tag has been handed out.
    LeastUsed { counts: BTreeMap<String, u64> },
}

/// Capability shared by all rotation strategies.
pub trait TagSelector: Send {
    /// Returns the next tag from `tags` and advances the rotation.
    ///
    /// # Errors
    ///
    /// Returns `RotationError::EmptyTags` if `tags` is empty.
    fn next(&mut self, tags: &[String]) -> Result<String, RotationError>;

    /// Current state, for status output.
    fn state(&self) -> RotationState;

    /// Re-reads persisted state, picking up changes made by another process.
    fn reload(&mut self) {}
}

/// Opens the rotator for `strategy`, loading its state from `state_dir`.
#[must_use]
pub fn open(strategy: TagStrategy, state_dir: &Path) -> Box<dyn TagSelector> {
    match strategy {
        TagStrategy::Circular => Box::new(CircularRotator::load(state_dir.join(files::TAG_INDEX))),
        TagStrategy::LeastUsed => {
            Box::new(LeastUsedRotator::load(state_dir.join(files::TAG_COUNTS)))
        }
    }
}

/// Walks the tag list in order and wraps around at the end.
#[derive(Debug, Default)]
pub struct CircularRotator {
    index: usize,
    path: Option<PathBuf>,
}

impl CircularRotator {
    /// Creates an unpersisted rotator starting at `index`.
    #[must_use]
    pub const fn new(index: usize) -> Self { Self { index, path: None } }

    /// Loads the cursor stored at `path`. A missing or unreadable file
    /// starts from the beginning of the list.
    #[must_use]
    pub fn load(path: PathBuf) -> Self { Self { index: read_index(&path), path: Some(path) } }

    fn persist(&self) {
        if let Some(path) = &self.path
            && let Err(err) = write_atomic(path, self.index.to_string().as_bytes())
        {
            tracing::warn!(path = %path.display(), error = %err, "failed to persist tag index");
        }
    }
}

impl TagSelector for CircularRotator {
    fn next(&mut self, tags: &[String]) -> Result<String, RotationError> {
        if tags.is_empty() {
            return Err(RotationError::EmptyTags);
        }

        // The list may have shrunk since the cursor was saved.
        let current = self.index % tags.len();
        let tag = tags[current].clone();
        self.index = (current + 1) % tags.len();
        self.persist();

        Ok(tag)
    }

    fn state(&self) -> RotationState { RotationState::Circular { index: self.index } }

    fn reload(&mut self) {
        if let Some(path) = &self.path {
            self.index = read_index(path);
        }
    }
}

/// Picks the tag that has been handed out the fewest times.
///
/// Ties go to the tag listed first. Counters for tags that are no longer
/// configured are dropped before every selection.
#[derive(Debug, Default)]
pub struct LeastUsedRotator {
    counts: HashMap<String, u64>,
    path: Option<PathBuf>,
}

impl LeastUsedRotator {
    /// Creates an unpersisted rotator with the given counters.
    #[must_use]
    pub const fn new(counts: HashMap<String, u64>) -> Self { Self { counts, path: None } }

    /// Loads the counters stored at `path`. A missing or malformed file
    /// starts with every tag unused.
    #[must_use]
    pub fn load(path: PathBuf) -> Self { Self { counts: read_counts(&path), path: Some(path) } }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let sorted: BTreeMap<&String, &u64> = self.counts.iter().collect();
        let result = serde_json::to_vec_pretty(&sorted)
            .map_err(io::Error::other)
            .and_then(|json| write_atomic(path, &json));

        if let Err(err) = result {
            tracing::warn!(path = %path.display(), error = %err, "failed to persist tag counts");
        }
    }
}

impl TagSelector for LeastUsedRotator {
    fn next(&mut self, tags: &[String]) -> Result<String, RotationError> {
        self.counts.retain(|tag, _| tags.contains(tag));

        let mut least: Option<(&String, u64)> = None;
        for tag in tags {
            let count = self.counts.get(tag).copied().unwrap_or(0);
            if least.is_none_or(|(_, best)| count < best) {
                least = Some((tag, count));
            }
        }

        let Some((tag, _)) = least else {
            return Err(RotationError::EmptyTags);
        };
        let tag = tag.clone();

        *self.counts.entry(tag.clone()).or_insert(0) += 1;
        self.persist();

        Ok(tag)
    }

    fn state(&self) -> RotationState {
        RotationState::LeastUsed {
            counts: self.counts.iter().map(|(tag, count)| (tag.clone(), *count)).collect(),
        }
    }

    fn reload(&mut self) {
        if let Some(path) = &self.path {
            self.counts = read_counts(path);
        }
    }
}

fn read_index(path: &Path) -> usize {
    match fs::read_to_string(path) {
        Ok(contents) => contents.trim().parse::<usize>().unwrap_or_else(|_| {
            tracing::warn!(path = %path.display(), "invalid tag index, starting over");
            0
        }),
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %err, "failed to read tag index");
            }
            0
        }
    }
}

fn read_counts(path: &Path) -> HashMap<String, u64> {
    match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), error = %err, "invalid tag counts, resetting");
            HashMap::new()
        }),
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %err, "failed to read tag counts");
            }
            HashMap::new()
        }
    }
}
