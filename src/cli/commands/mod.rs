//! Command execution.
//!
//! Each command returns an exit code; failures are reported here with
//! recovery suggestions and turned into exit code 1.

mod key;
mod package;
mod publish;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::config::default_base_name;
use crate::error::Result;
use std::path::Path;

use key::execute_key;
use package::execute_package;
use publish::execute_publish;

/// Execute the command selected by `args`
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {validation_error}"));
        return Ok(1);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::Publish(publish) => execute_publish(publish, &config).await,
        Command::Package {
            source,
            output,
            name,
        } => execute_package(&source.source, output, name.as_deref(), &config).await,
        Command::Key {
            source,
            destination,
            uri,
        } => execute_key(&source.source, destination, *uri, &config),
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            config.error_println(&format!("Command '{}' failed: {e}", args.command.name()));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() && !config.is_quiet() {
                config.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    config.println(&format!("  • {suggestion}"));
                }
            }

            Ok(1)
        }
    }
}

/// Explicit base name, or the source directory's name.
fn resolve_base_name(name: Option<&str>, source: &Path) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => default_base_name(source),
    }
}
