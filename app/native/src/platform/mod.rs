//! Platform helpers shared by the config, state, and pipeline modules.

pub mod path;

pub use path::{expand, expand_and_resolve, sanitize_component};
