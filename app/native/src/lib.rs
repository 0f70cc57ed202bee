//! Wallfetch - fetches wallpapers from photo-search providers and rotates the desktop background.
//!
//! Each run rotates through the configured tags, queries a randomly chosen
//! provider for every download slot, filters the results by aspect ratio and
//! content hash, and stores the survivors in the wallpaper directory. A run
//! only counts as done (and starts the next interval) when enough of its
//! slots succeed.

// Core modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod schema;

// Acquisition
pub mod connectivity;
pub mod ledger;
pub mod lock;
pub mod orchestrator;
pub mod pipeline;
pub mod providers;
pub mod retry;
pub mod rotation;

// Local state and desktop
pub mod platform;
pub mod state;
pub mod wallpaper;
