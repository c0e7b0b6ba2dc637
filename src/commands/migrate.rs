use anyhow::{Context, Result};

use crate::borg::repo::BorgRepo;
use crate::commands::CommandReport;
use crate::migrate::audit::AuditLog;
use crate::migrate::config::{ConfigOverrides, load_config};
use crate::migrate::driver;
use crate::migrate::tools::resolve_toolchain;

pub fn run(overrides: &ConfigOverrides) -> Result<CommandReport> {
    let cfg = load_config(overrides)?;
    let tools = resolve_toolchain()?;
    let audit = AuditLog::new(cfg.audit_log.clone());
    let mut report = CommandReport::new("migrate");

    let mut repo = match BorgRepo::load(&tools.borg, &tools.fusermount, cfg.naive_zone()?) {
        Ok(repo) => repo,
        Err(err) => {
            audit.record("catalog", "failed", None, &format!("{err:#}"));
            return Err(err).context("error loading borg archives");
        }
    };
    audit.record(
        "catalog",
        "ok",
        None,
        &format!("{} archives listed", repo.archives().len()),
    );

    let outcome = driver::run(&mut repo, &tools.restic, &cfg, &audit)?;

    report.detail(format!("archives_listed={}", repo.archives().len()));
    report.detail(format!("archive_prefix={:?}", cfg.archive_prefix));
    report.detail(format!("archives_planned={}", outcome.planned));
    report.detail(format!("mount_dir={}", outcome.mount_dir.display()));
    for name in &outcome.migrated {
        report.detail(format!("migrated {name}"));
    }
    Ok(report)
}
