//! Post-install bundle commands

use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::error::{BundleError, GENERAL_EXIT_CODE, Result};

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Run `command` through the shell inside `dir`.
///
/// A non-zero exit becomes `ExternalCommandFailed` carrying the exit code.
pub fn run_post_command(bundle: &str, command: &str, dir: &Path) -> Result<()> {
    info!(bundle, command, "running bundle command");

    let status = shell(command)
        .current_dir(dir)
        .status()
        .map_err(|e| BundleError::CommandSpawnFailed {
            bundle: bundle.to_string(),
            reason: e.to_string(),
        })?;

    if status.success() {
        return Ok(());
    }

    Err(BundleError::ExternalCommandFailed {
        bundle: bundle.to_string(),
        command: command.to_string(),
        code: status.code().unwrap_or(GENERAL_EXIT_CODE),
    })
}
