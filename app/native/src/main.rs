#![allow(clippy::multiple_crate_versions)]

//! Wallfetch command line entry point.
//!
//! Every invocation is a single command (`wallfetch run`, `wallfetch apply`,
//! ...). Scheduling is left to cron, launchd or a systemd timer; the run
//! command itself skips work when the configured interval has not elapsed.

fn main() {
    if let Err(err) = wallfetch_lib::cli::run() {
        eprintln!("wallfetch: {err}");
        std::process::exit(1);
    }
}
