use std::path::Path;
use std::process::{Command, Output, Stdio};

use crate::error::MigrateError;

/// Human-readable form of a command line, program reduced to its file name.
pub fn describe(cmd: &Command) -> String {
    let program = Path::new(cmd.get_program())
        .file_name()
        .unwrap_or(cmd.get_program())
        .to_string_lossy()
        .to_string();
    let mut parts = vec![program];
    parts.extend(cmd.get_args().map(|arg| arg.to_string_lossy().to_string()));
    parts.join(" ")
}

/// Run with inherited stdio and wait for exit.
pub fn run_checked(cmd: &mut Command) -> Result<(), MigrateError> {
    let label = describe(cmd);
    let status = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|err| MigrateError::ExternalProcess {
            program: label.clone(),
            detail: format!("failed to launch: {err}"),
        })?;

    if status.success() {
        return Ok(());
    }
    Err(MigrateError::ExternalProcess {
        program: label,
        detail: status.to_string(),
    })
}

/// Run capturing stdout; stdin and stderr stay attached so the child can
/// prompt for a passphrase.
pub fn output_checked(cmd: &mut Command) -> Result<Output, MigrateError> {
    let label = describe(cmd);
    let output = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|err| MigrateError::ExternalProcess {
            program: label.clone(),
            detail: format!("failed to launch: {err}"),
        })?;

    if output.status.success() {
        return Ok(output);
    }
    Err(MigrateError::ExternalProcess {
        program: label,
        detail: output.status.to_string(),
    })
}
