//! Toolchain check run before anything is downloaded.

use tracing::{debug, info};

use crate::command::{CommandRunner, CommandSpec};
use crate::error::{BuildError, Result};

/// Commands that must succeed for the build to have a compiler.
pub fn toolchain_commands(macos: bool) -> Vec<CommandSpec> {
    if macos {
        vec![
            CommandSpec::new("xcode-select").arg("-p"),
            CommandSpec::new("clang").arg("--version"),
        ]
    } else {
        vec![CommandSpec::new("cc").arg("--version")]
    }
}

/// Verifies that a C compiler is available.
///
/// # Errors
///
/// Returns [`BuildError::Toolchain`] naming the first command that failed.
pub fn check_toolchain(runner: &dyn CommandRunner) -> Result<()> {
    check_toolchain_for(runner, cfg!(target_os = "macos"))
}

fn check_toolchain_for(runner: &dyn CommandRunner, macos: bool) -> Result<()> {
    for spec in toolchain_commands(macos) {
        match runner.run(&spec) {
            Ok(out) => debug!(command = %spec, output = %out.output.trim(), "toolchain ok"),
            Err(e) => {
                let hint = if macos {
                    " (install the Xcode command line tools with 'xcode-select --install')"
                } else {
                    ""
                };
                return Err(BuildError::Toolchain(format!("{e}{hint}")));
            }
        }
    }
    info!("toolchain found");
    Ok(())
}
