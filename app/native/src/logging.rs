//! Tracing subscriber setup.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "wallfetch=info,wallfetch_lib=info";

/// Installs the global subscriber: human-readable output on stderr, plus a
/// plain-text copy appended to `log_file` when given.
///
/// Calling this twice is harmless; the second call keeps the first setup.
pub fn init(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let file = log_file.and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(fmt::layer().with_writer(Arc::new(file)).with_ansi(false)),
            Err(err) => {
                eprintln!("wallfetch: cannot open log file {}: {err}", path.display());
                None
            }
        }
    });

    let _ = tracing_subscriber::registry().with(filter).with(stderr).with(file).try_init();
}
