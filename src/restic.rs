use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::MigrateError;
use crate::process;

/// Layout restic accepts for `--time`, read back in the local zone.
pub const RESTIC_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Default)]
pub struct BackupOverrides {
    pub hostname: Option<String>,
    pub set_path: Option<String>,
}

/// A `restic backup .` run from `workdir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInvocation {
    pub args: Vec<String>,
    pub workdir: PathBuf,
}

impl BackupInvocation {
    /// `--force` is always passed: every replayed archive is its own
    /// snapshot even when restic sees no change against the parent.
    pub fn new(start_time: &DateTime<Local>, overrides: &BackupOverrides, workdir: &Path) -> Self {
        let mut args = vec!["backup".to_string(), "--force".to_string()];
        if let Some(hostname) = &overrides.hostname {
            args.push("-H".to_string());
            args.push(hostname.clone());
        }
        args.push("--time".to_string());
        args.push(start_time.format(RESTIC_TIME_FORMAT).to_string());
        if let Some(set_path) = &overrides.set_path {
            args.push("--set-path".to_string());
            args.push(set_path.clone());
        }
        args.push(".".to_string());

        Self {
            args,
            workdir: workdir.to_path_buf(),
        }
    }

    pub fn command(&self, restic_bin: &Path) -> Command {
        let mut cmd = Command::new(restic_bin);
        cmd.args(&self.args).current_dir(&self.workdir);
        cmd
    }

    pub fn run(&self, restic_bin: &Path) -> Result<(), MigrateError> {
        process::run_checked(&mut self.command(restic_bin))
    }
}
