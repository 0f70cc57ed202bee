//! `status` and `last-run` commands.

use std::path::PathBuf;

use chrono::{Local, TimeZone};
use colored::Colorize;
use serde::Serialize;

use crate::cli::output::print_json;
use crate::config::LoadedConfig;
use crate::constants::files;
use crate::error::WallfetchError;
use crate::ledger::DedupLedger;
use crate::lock::ProcessLock;
use crate::orchestrator::LastRunMarker;
use crate::rotation::{self, RotationState};
use crate::state::{dir_size, format_bytes};
use crate::wallpaper::list_images;

/// Snapshot of everything wallfetch keeps between runs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Status {
    last_run: Option<f64>,
    ledger_records: usize,
    rotation: RotationState,
    running_pid: Option<u32>,
    wallpaper_directory: PathBuf,
    wallpaper_count: usize,
    wallpaper_bytes: u64,
    state_directory: PathBuf,
    config_file: Option<PathBuf>,
}

/// Formats epoch seconds as a local date and time.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_timestamp(seconds: f64) -> String {
    Local
        .timestamp_opt(seconds.floor() as i64, 0)
        .single()
        .map_or_else(|| format!("{seconds}"), |time| time.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Prints the last committed run.
///
/// # Errors
///
/// Never fails; the signature matches the other commands.
#[allow(clippy::unnecessary_wraps)]
pub fn last_run(loaded: &LoadedConfig) -> Result<(), WallfetchError> {
    let marker = LastRunMarker::new(loaded.state_dir().join(files::LAST_RUN));
    match marker.read() {
        Some(seconds) => println!("{}", format_timestamp(seconds)),
        None => println!("never"),
    }
    Ok(())
}

/// Prints the persisted state.
///
/// # Errors
///
/// Returns an error if the ledger exists but cannot be read.
pub fn execute(loaded: &LoadedConfig, json: bool) -> Result<(), WallfetchError> {
    let state_dir = loaded.state_dir();
    let wallpaper_dir = loaded.wallpaper_dir();

    let lock = ProcessLock::new(state_dir.join(files::LOCK));
    let status = Status {
        last_run: LastRunMarker::new(state_dir.join(files::LAST_RUN)).read(),
        ledger_records: DedupLedger::open(&state_dir.join(files::LEDGER))?.len(),
        rotation: rotation::open(loaded.config.tag_strategy, &state_dir).state(),
        running_pid: lock.live_holder(),
        wallpaper_count: list_images(&wallpaper_dir).len(),
        wallpaper_bytes: dir_size(&wallpaper_dir).unwrap_or(0),
        wallpaper_directory: wallpaper_dir,
        state_directory: state_dir,
        config_file: loaded.path.clone(),
    };

    if json {
        print_json(&status).map_err(|e| e.to_string())?;
        return Ok(());
    }

    let last_run = status.last_run.map_or_else(|| "never".to_string(), format_timestamp);
    println!("{:<16} {last_run}", "Last run:".bold());
    println!("{:<16} {}", "Ledger:".bold(), status.ledger_records);
    match &status.rotation {
        RotationState::Circular { index } => {
            let tags = loaded.config.effective_tags();
            let next = tags.get(index % tags.len().max(1)).map_or("-", String::as_str);
            println!("{:<16} circular, next \"{next}\"", "Rotation:".bold());
        }
        RotationState::LeastUsed { counts } => {
            let used: u64 = counts.values().sum();
            println!("{:<16} least-used, {used} selections over {} tags", "Rotation:".bold(), counts.len());
        }
    }
    let running = status
        .running_pid
        .map_or_else(|| "no".dimmed().to_string(), |pid| format!("yes (pid {pid})").green().to_string());
    println!("{:<16} {running}", "Running:".bold());
    println!(
        "{:<16} {} ({} images, {})",
        "Wallpapers:".bold(),
        status.wallpaper_directory.display(),
        status.wallpaper_count,
        format_bytes(status.wallpaper_bytes)
    );
    println!("{:<16} {}", "State:".bold(), status.state_directory.display());
    match &status.config_file {
        Some(path) => println!("{:<16} {}", "Config:".bold(), path.display()),
        None => println!("{:<16} defaults", "Config:".bold()),
    }

    Ok(())
}
