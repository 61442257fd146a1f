//! Command line interface for kodegen_image_release.
//!
//! This module provides argument parsing, command dispatch, and terminal
//! feedback for the `build`, `push` and `get-version` commands.

mod args;
pub mod commands;
mod output;
mod timeout_config;

pub use args::{Args, Command, RuntimeConfig};
pub use commands::execute_command;
pub use output::OutputManager;
pub use timeout_config::TimeoutConfig;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
