//! Config CLI commands.
//!
//! Commands for managing the wallfetch configuration file.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::cli::output::print_json;
use crate::config::template::{create_config_file, generate_config_template};
use crate::config::{self, ConfigError, config_paths};
use crate::error::WallfetchError;

/// Config management commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ConfigCommands {
    /// Initialize a new configuration file with all options documented.
    ///
    /// Creates a new configuration file at the default location with all
    /// available options commented out.
    #[command(
        name = "init",
        after_long_help = r#"Examples:
  wallfetch config init              # Create config at default location
  wallfetch config init --force      # Overwrite existing config
  wallfetch config init --path ~/my-config.jsonc  # Create at custom path
  wallfetch config init --stdout     # Print template to stdout"#
    )]
    Init {
        /// Overwrite existing configuration file if it exists.
        #[arg(long, short)]
        force: bool,

        /// Custom path for the configuration file.
        /// If not specified, uses ~/.config/wallfetch/config.jsonc
        #[arg(long, short, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Print the configuration template to stdout instead of writing to a file.
        #[arg(long)]
        stdout: bool,
    },

    /// Show the path to the configuration file.
    ///
    /// Displays the paths where wallfetch looks for configuration files,
    /// and indicates which one is currently in use (if any).
    Path,

    /// Print the effective configuration, defaults included, as JSON.
    Show,
}

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cmd: &ConfigCommands, custom_path: Option<&Path>) -> Result<(), WallfetchError> {
    match cmd {
        ConfigCommands::Init { force, path, stdout } => {
            if *stdout {
                println!("{}", generate_config_template());
                Ok(())
            } else {
                init_config(*force, path.clone())
            }
        }
        ConfigCommands::Path => {
            show_config_path();
            Ok(())
        }
        ConfigCommands::Show => show_config(custom_path),
    }
}

/// Initialize a new configuration file.
fn init_config(force: bool, custom_path: Option<PathBuf>) -> Result<(), WallfetchError> {
    let config_path = custom_path.unwrap_or_else(|| {
        config_paths().into_iter().next().unwrap_or_else(|| PathBuf::from("config.jsonc"))
    });

    if config_path.exists() && !force {
        return Err(WallfetchError::Config(ConfigError::Invalid(format!(
            "configuration file already exists at {}; use --force to overwrite",
            config_path.display()
        ))));
    }

    create_config_file(&config_path).map_err(ConfigError::IoError)?;

    println!("Configuration file created at: {}", config_path.display());
    println!("\nAll options are commented out by default.");
    println!("Edit the file and uncomment the options you want to configure.");

    Ok(())
}

/// Show the configuration file search paths.
fn show_config_path() {
    println!("Configuration file search paths (in priority order):\n");

    let mut found_config = false;
    for (i, path) in config_paths().iter().enumerate() {
        let exists = path.exists();
        let marker = if exists && !found_config {
            found_config = true;
            " (active)"
        } else if exists {
            " (exists)"
        } else {
            ""
        };

        println!("  {}. {}{}", i + 1, path.display(), marker);
    }

    if !found_config {
        println!("\nNo configuration file found.");
        println!("Run 'wallfetch config init' to create one.");
    }
}

/// Print the effective configuration.
fn show_config(custom_path: Option<&Path>) -> Result<(), WallfetchError> {
    let loaded = config::load(custom_path)?;
    print_json(&loaded.config).map_err(ConfigError::ParseError)?;
    Ok(())
}
