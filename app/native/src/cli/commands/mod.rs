//! CLI command definitions using Clap.
//!
//! This module defines all CLI commands and their arguments, organized into
//! domain-specific submodules:
//!
//! - `config_cmd` - Configuration file management
//! - `run` - Acquisition runs and wallpaper application
//! - `status` - Inspection of persisted state

use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use crate::config::{self, LoadedConfig};
use crate::error::WallfetchError;
use crate::{logging, schema};

pub mod config_cmd;
pub mod run;
pub mod status;

pub use config_cmd::ConfigCommands;
pub use run::{ApplyArgs, RunArgs};

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// wallfetch - downloads fresh wallpapers and rotates the desktop background.
#[derive(Parser, Debug)]
#[command(name = "wallfetch")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Download new wallpapers, then apply one.
    ///
    /// Does nothing when the last run is more recent than `runIntervalHours`
    /// and the wallpaper directory already has images, unless --force is given.
    /// Exits quietly when another instance is already running.
    Run(RunArgs),

    /// Apply a wallpaper from the wallpaper directory without downloading.
    Apply(ApplyArgs),

    /// Print when the last successful run happened.
    LastRun,

    /// Show persisted state: last run, ledger size, tag rotation, directories.
    Status {
        /// Output as JSON.
        #[arg(long, short)]
        json: bool,
    },

    /// Configuration file management commands.
    ///
    /// Initialize, view, and locate the configuration file.
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Output the configuration JSON Schema.
    ///
    /// Outputs a JSON Schema to stdout that describes the structure of the
    /// configuration file. Can be redirected to a file for use with
    /// editors that support JSON Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Outputs shell completion script to stdout for the specified shell.
    ///
    /// Usage:
    ///   eval "$(wallfetch completions --shell zsh)"
    ///   wallfetch completions --shell fish > ~/.config/fish/completions/wallfetch.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> { self.config.as_ref().map(PathBuf::from) }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), WallfetchError> {
        match &self.command {
            Commands::Run(args) => run::execute(&self.load_config()?, args),
            Commands::Apply(args) => run::apply(&self.load_config()?, args),
            Commands::LastRun => status::last_run(&self.load_config()?),
            Commands::Status { json } => status::execute(&self.load_config()?, *json),
            Commands::Config(cmd) => {
                logging::init(None);
                config_cmd::execute(cmd, self.config_path().as_deref())
            }
            Commands::Schema => {
                println!("{}", schema::generate_schema_json());
                Ok(())
            }
            Commands::Completions { shell } => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Loads the configuration and starts logging to the configured file.
    fn load_config(&self) -> Result<LoadedConfig, WallfetchError> {
        let loaded = config::load(self.config_path().as_deref())?;
        let log_file = loaded.config.log_file.as_deref().map(|file| {
            crate::platform::expand_and_resolve(file, &loaded.state_dir())
        });
        logging::init(log_file.as_deref());
        tracing::debug!(path = ?loaded.path, "configuration loaded");
        Ok(loaded)
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "wallfetch", &mut io::stdout());
    }
}
