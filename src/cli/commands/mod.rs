//! Command execution functions.
//!
//! Each command maps to one entry point of the library: `get-version` to
//! version resolution, `build` to a standalone build, `push` to the full
//! release pipeline.

mod build;
mod get_version;
mod push;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::{CliError, ReleaseError, Result};

use build::execute_build;
use get_version::execute_get_version;
use push::execute_push;

/// Execute the parsed command and return the process exit code.
///
/// Step failures are reported here (naming the failing step) and turned into
/// a non-zero exit code rather than propagated.
pub async fn execute_command(args: Args) -> Result<i32> {
    let config = RuntimeConfig::from(&args);

    if let Err(reason) = config.timeouts.validate() {
        let e = ReleaseError::from(CliError::InvalidArguments { reason });
        config.error_println(&e.to_string());
        return Ok(e.exit_code());
    }

    let result = match &args.command {
        Command::Build { version } => execute_build(&args, &config, version).await,
        Command::Push => execute_push(&args, &config).await,
        Command::GetVersion => execute_get_version(&args, &config).await,
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            config.error_println(&format!(
                "Command '{}' failed at step '{}': {}",
                args.command.name(),
                e.step(),
                e
            ));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                eprintln!("\nRecovery suggestions:");
                for suggestion in suggestions {
                    eprintln!("  • {}", suggestion);
                }
            }

            Ok(e.exit_code())
        }
    }
}
