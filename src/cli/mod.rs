//! Command-line interface for bizcrawl.

mod commands;

pub use commands::{is_debug, run, Cli};
