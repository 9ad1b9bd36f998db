//! CLI module for docstore
//!
//! Thin command-line surface over the document store. Every command prints
//! one JSON operation envelope on stdout.

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, Placement};
pub use commands::{execute, init_logging, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_json_to;
