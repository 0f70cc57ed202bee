//! Application-wide constants.

/// Identifier used for the config, data, and cache directory names.
pub const APP_ID: &str = "wallfetch";

/// File names inside the state directory.
pub mod files {
    /// Dedup ledger, one `hash:timestamp` record per line.
    pub const LEDGER: &str = "ledger.txt";
    /// Circular tag cursor, a single integer.
    pub const TAG_INDEX: &str = "tag_index.txt";
    /// Least-used tag counters, a JSON object of `tag -> count`.
    pub const TAG_COUNTS: &str = "tag_counts.json";
    /// Epoch seconds of the last committed run.
    pub const LAST_RUN: &str = "last_run.txt";
    /// Process lock holding the owner's decimal PID.
    pub const LOCK: &str = "wallfetch.lock";
}

/// Seconds in one hour.
pub const SECONDS_PER_HOUR: f64 = 60.0 * 60.0;

/// Seconds in one day.
pub const SECONDS_PER_DAY: f64 = 24.0 * SECONDS_PER_HOUR;

/// Tags searched when the configuration does not provide any.
pub const DEFAULT_TAGS: &[&str] = &[
    "nature",
    "tree",
    "sky",
    "beach",
    "waterfall",
    "night",
    "mountain",
    "garden",
    "sunset",
    "river",
    "landscape",
    "forest",
    "rain",
    "bird",
    "ocean",
    "fish in water",
    "butterfly",
    "flower",
    "sunrise",
    "skyline",
    "northern lights",
    "forest rain",
];
