//! Command line interface for release_packager.
//!
//! Parses arguments, builds the run configuration and reports progress and
//! failures to the terminal.

mod args;
pub mod commands;
mod output;
mod retry_config;

pub use args::{
    Args, Command, CredentialMode, DestinationArgs, PublishArgs, RoleArgs, RuntimeConfig,
    SourceArgs,
};
pub use commands::execute_command;
pub use output::OutputManager;
pub use retry_config::{MAX_PUBLISH_RETRIES, PUBLISH_RETRIES_ENV, RetryConfig};

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
