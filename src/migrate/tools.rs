use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const BORG_BIN_VAR: &str = "BORG_BIN";
pub const RESTIC_BIN_VAR: &str = "RESTIC_BIN";
pub const FUSERMOUNT_BIN_VAR: &str = "FUSERMOUNT_BIN";

#[derive(Debug, Clone)]
pub struct Toolchain {
    pub borg: PathBuf,
    pub restic: PathBuf,
    pub fusermount: PathBuf,
}

fn ensure_file(path: &Path, var: &str) -> Result<()> {
    let meta = fs::metadata(path)
        .with_context(|| format!("{var} points to a missing path: {}", path.display()))?;
    if !meta.is_file() {
        anyhow::bail!("{var} is not a file: {}", path.display());
    }
    Ok(())
}

/// `$var` if set, otherwise `name` looked up on PATH.
pub fn resolve_bin(var: &str, name: &str) -> Result<PathBuf> {
    if let Ok(custom) = env::var(var) {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            let path = PathBuf::from(trimmed);
            ensure_file(&path, var)?;
            return Ok(path);
        }
    }
    which::which(name).with_context(|| format!("{name} binary not found in {var} or PATH"))
}

pub fn resolve_toolchain() -> Result<Toolchain> {
    Ok(Toolchain {
        borg: resolve_bin(BORG_BIN_VAR, "borg")?,
        restic: resolve_bin(RESTIC_BIN_VAR, "restic")?,
        fusermount: resolve_bin(FUSERMOUNT_BIN_VAR, "fusermount")?,
    })
}
