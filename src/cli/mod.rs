//! Command-line interface module.
//!
//! This module handles:
//! - Argument parsing via clap
//! - Progress display via indicatif

mod args;
mod progress;

pub use args::{Args, Command, IngestArgs, ReconcileArgs};
pub use progress::JobProgress;
