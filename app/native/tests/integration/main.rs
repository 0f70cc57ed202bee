//! End-to-end runs of the acquisition orchestrator against scripted providers.
//!
//! ```bash
//! cargo test -p wallfetch --test integration
//! ```

mod common;
mod orchestrator_scenarios;
mod wallpaper_rotation;
