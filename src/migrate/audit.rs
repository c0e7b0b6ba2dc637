use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::migrate::warn::{self, WarnEvent};

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub at_epoch_secs: u64,
    pub phase: String,
    pub status: String,
    pub archive: Option<String>,
    pub message: String,
}

pub fn append_event(
    path: &Path,
    phase: &str,
    status: &str,
    archive: Option<&str>,
    message: &str,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let event = AuditEvent {
        at_epoch_secs: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock is before UNIX_EPOCH")?
            .as_secs(),
        phase: phase.to_string(),
        status: status.to_string(),
        archive: archive.map(ToOwned::to_owned),
        message: message.to_string(),
    };

    let line = format!("{}\n", serde_json::to_string(&event)?);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Audit sink that never fails the run; write errors become warnings.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn record(&self, phase: &str, status: &str, archive: Option<&str>, message: &str) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(err) = append_event(path, phase, status, archive, message) {
            warn::emit(WarnEvent {
                code: "AUDIT_WRITE_FAILED",
                stage: phase,
                action: "append-audit-event",
                archive: archive.unwrap_or_default(),
                path: &path.display().to_string(),
                reason: "audit-write-failed",
                err: &format!("{err:#}"),
            });
        }
    }
}
