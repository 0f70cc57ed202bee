//! `run` and `apply` commands.

use std::num::NonZeroUsize;

use clap::Args;
use colored::Colorize;

use crate::cli::output::shorten;
use crate::config::{LoadedConfig, SelectionMode};
use crate::error::WallfetchError;
use crate::orchestrator::{Orchestrator, RunOptions, RunReport, RunSettings, RunStatus, TaskOutcome};
use crate::providers::ProviderRegistry;
use crate::wallpaper::{self, DesktopSetter};

/// Arguments of `wallfetch run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Download even if the last run is recent.
    #[arg(long, short)]
    pub force: bool,

    /// Search this tag in every slot instead of rotating through the tag list.
    #[arg(long, short, value_name = "TAG")]
    pub tag: Option<String>,

    /// Number of images to fetch concurrently (defaults to `imagesPerRun`).
    #[arg(long, short, value_name = "N")]
    pub nums: Option<NonZeroUsize>,

    /// Do not apply a wallpaper after downloading.
    #[arg(long)]
    pub no_apply: bool,
}

/// Arguments of `wallfetch apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Pick uniformly at random instead of the configured selection mode.
    #[arg(long, short)]
    pub random: bool,
}

/// Runs one acquisition and applies a wallpaper afterwards.
///
/// # Errors
///
/// Returns an error if the run cannot be set up or its state cannot be
/// persisted. Another running instance is not an error.
pub fn execute(loaded: &LoadedConfig, args: &RunArgs) -> Result<(), WallfetchError> {
    let config = &loaded.config;
    let registry = ProviderRegistry::from_config(config, &loaded.api_keys())?;
    let mut orchestrator = Orchestrator::new(
        RunSettings::from_config(config),
        registry,
        loaded.wallpaper_dir(),
        &loaded.state_dir(),
    )?;

    let options = RunOptions {
        force: args.force,
        tag_override: args.tag.clone(),
        nums: args.nums.map(NonZeroUsize::get),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let report = match runtime.block_on(orchestrator.run(options)) {
        Ok(report) => report,
        Err(err) if err.is_lock_contention() => {
            tracing::info!("{err}; exiting");
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    print_report(&report);

    if config.apply_after_run && !args.no_apply {
        wallpaper::apply_from_directory(&loaded.wallpaper_dir(), config.selection, &DesktopSetter)?;
    }

    Ok(())
}

/// Applies a wallpaper from the destination directory.
///
/// # Errors
///
/// Returns an error if the chosen image cannot be applied.
pub fn apply(loaded: &LoadedConfig, args: &ApplyArgs) -> Result<(), WallfetchError> {
    let mode = if args.random { SelectionMode::Random } else { loaded.config.selection };

    match wallpaper::apply_from_directory(&loaded.wallpaper_dir(), mode, &DesktopSetter)? {
        Some(path) => println!("{} {}", "Applied".green(), path.display()),
        None => println!("{}", "No images in the wallpaper directory.".yellow()),
    }
    Ok(())
}

/// Longest failure message shown per task line.
const MAX_ERROR_CHARS: usize = 120;

fn print_report(report: &RunReport) {
    match report.status {
        RunStatus::NotDue { next_due, .. } => {
            println!("{} next run is due at {}", "Skipped:".yellow(), super::status::format_timestamp(next_due));
            return;
        }
        RunStatus::Offline => {
            println!("{} no internet connection", "Skipped:".yellow());
            return;
        }
        RunStatus::Committed | RunStatus::Aborted => {}
    }

    for result in &report.results {
        let line = match &result.outcome {
            TaskOutcome::Success(path) => format!("{} {}", "saved".green(), path.display()),
            TaskOutcome::Skipped(reason) => format!("{} {reason}", "skipped".yellow()),
            TaskOutcome::Failed(err) => format!("{} {}", "failed".red(), shorten(err, MAX_ERROR_CHARS)),
        };
        println!("  [{}] {} \"{}\": {line}", result.slot, result.provider, result.tag);
    }

    let summary = format!(
        "{} saved, {} skipped, {} failed",
        report.saved().len(),
        report.skipped(),
        report.error_count
    );
    if report.status == RunStatus::Committed {
        println!("{} {summary}", "Run committed:".green().bold());
    } else {
        println!("{} {summary}; will retry on the next invocation", "Run aborted:".red().bold());
    }
}
