use anyhow::{Context, Result};
use std::path::Path;

use crate::borg::archive::load_catalog;
use crate::commands::CommandReport;
use crate::migrate::config::{ConfigOverrides, load_config};
use crate::migrate::driver::build_plan;
use crate::migrate::tools::{BORG_BIN_VAR, resolve_bin};
use crate::process;
use crate::restic::RESTIC_TIME_FORMAT;

const MOUNT_PLACEHOLDER: &str = "$MOUNT";

/// Print what `migrate` would run, without mounting or backing up.
pub fn run(overrides: &ConfigOverrides) -> Result<CommandReport> {
    let cfg = load_config(overrides)?;
    let borg = resolve_bin(BORG_BIN_VAR, "borg")?;
    let archives =
        load_catalog(&borg, cfg.naive_zone()?).context("error loading borg archives")?;

    let plan = build_plan(&archives, Path::new(MOUNT_PLACEHOLDER), &cfg);
    let mut report = CommandReport::new("plan");
    report.detail(format!("archives_listed={}", archives.len()));
    report.detail(format!("archives_planned={}", plan.len()));
    for archive in &archives {
        report.detail(format!(
            "archive {} id={} start={} recorded={}",
            archive.label,
            archive.id,
            archive.start_time.format(RESTIC_TIME_FORMAT),
            archive.recorded_time.format(RESTIC_TIME_FORMAT)
        ));
    }
    for step in &plan {
        let cmd = step.invocation.command(Path::new("restic"));
        report.detail(format!(
            "{} (id {}): cd {} && {}",
            step.archive_name,
            step.archive_id,
            step.invocation.workdir.display(),
            process::describe(&cmd)
        ));
    }
    Ok(report)
}
