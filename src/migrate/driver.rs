use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::borg::archive::BorgArchive;
use crate::borg::repo::BorgRepo;
use crate::error::MigrateError;
use crate::migrate::audit::AuditLog;
use crate::migrate::config::MigrateConfig;
use crate::migrate::progress::Progress;
use crate::migrate::warn::{self, WarnEvent};
use crate::process;
use crate::restic::BackupInvocation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBackup {
    pub archive_id: String,
    pub archive_name: String,
    pub archive_label: String,
    pub invocation: BackupInvocation,
}

#[derive(Debug, Clone, Default)]
pub struct MigrationOutcome {
    pub mount_dir: PathBuf,
    pub planned: usize,
    pub migrated: Vec<String>,
}

/// Archives whose name starts with `prefix`, in catalog order.
pub fn select_by_prefix<'a>(archives: &'a [BorgArchive], prefix: &str) -> Vec<&'a BorgArchive> {
    archives
        .iter()
        .filter(|archive| archive.name.starts_with(prefix))
        .collect()
}

pub fn archive_workdir(mount_root: &Path, archive_name: &str, sub_path: Option<&Path>) -> PathBuf {
    let dir = mount_root.join(archive_name);
    match sub_path {
        Some(sub) => dir.join(sub),
        None => dir,
    }
}

pub fn build_plan(
    archives: &[BorgArchive],
    mount_root: &Path,
    cfg: &MigrateConfig,
) -> Vec<PlannedBackup> {
    let overrides = cfg.backup_overrides();
    select_by_prefix(archives, &cfg.archive_prefix)
        .into_iter()
        .map(|archive| PlannedBackup {
            archive_id: archive.id.clone(),
            archive_name: archive.name.clone(),
            archive_label: archive.label.clone(),
            invocation: BackupInvocation::new(
                &archive.start_time,
                &overrides,
                &archive_workdir(mount_root, &archive.name, cfg.sub_path.as_deref()),
            ),
        })
        .collect()
}

/// Replay every planned archive of a mounted repository into restic, then
/// unmount. The first failing backup ends the run with its error.
pub fn migrate(
    repo: &mut BorgRepo,
    restic_bin: &Path,
    cfg: &MigrateConfig,
    audit: &AuditLog,
) -> Result<Vec<String>> {
    let Some(mount_root) = repo.mount_point().map(Path::to_path_buf) else {
        return Err(MigrateError::LifecycleMisuse(
            "migration requires a mounted repository".to_string(),
        )
        .into());
    };

    let plan = build_plan(repo.archives(), &mount_root, cfg);
    let progress = Progress::new(plan.len(), cfg.progress);
    let mut migrated = Vec::with_capacity(plan.len());

    for (index, step) in plan.iter().enumerate() {
        let label = process::describe(&step.invocation.command(restic_bin));
        progress.start_archive(index, &step.archive_label, &label);

        if let Err(err) = step.invocation.run(restic_bin) {
            progress.abandon();
            audit.record(
                "backup",
                "failed",
                Some(&step.archive_name),
                &format!("{}: {err}", err.code()),
            );
            return Err(err.into());
        }
        audit.record("backup", "ok", Some(&step.archive_name), &label);
        migrated.push(step.archive_name.clone());
    }
    progress.finish();

    let unmounted = repo.unmount();
    audit.record(
        "unmount",
        if unmounted.is_ok() { "ok" } else { "failed" },
        None,
        &mount_root.display().to_string(),
    );
    unmounted?;
    Ok(migrated)
}

fn mount_and_migrate(
    repo: &mut BorgRepo,
    mount_dir: &Path,
    restic_bin: &Path,
    cfg: &MigrateConfig,
    audit: &AuditLog,
) -> Result<Vec<String>> {
    let mounted = repo.mount(mount_dir);
    audit.record(
        "mount",
        if mounted.is_ok() { "ok" } else { "failed" },
        None,
        &mount_dir.display().to_string(),
    );
    mounted?;
    eprintln!("mounted at {}", mount_dir.display());

    migrate(repo, restic_bin, cfg, audit)
}

fn cleanup_unmount(repo: &mut BorgRepo) {
    let Some(mount_point) = repo.mount_point().map(|p| p.display().to_string()) else {
        return;
    };
    if let Err(err) = repo.unmount() {
        warn::emit(WarnEvent {
            code: "UNMOUNT_FAILED",
            stage: "cleanup",
            action: "fusermount-u",
            archive: "",
            path: &mount_point,
            reason: "cleanup-unmount-failed",
            err: &format!("{err:#}"),
        });
    }
}

/// Full run over a loaded repository: scoped mount directory, mount,
/// migrate, and cleanup on every exit path.
pub fn run(
    repo: &mut BorgRepo,
    restic_bin: &Path,
    cfg: &MigrateConfig,
    audit: &AuditLog,
) -> Result<MigrationOutcome> {
    let mount_dir = tempfile::Builder::new()
        .prefix("borg2restic")
        .tempdir()
        .context("unable to create temporary folder")?;
    let mount_path = mount_dir.path().to_path_buf();
    let planned = select_by_prefix(repo.archives(), &cfg.archive_prefix).len();

    let result = mount_and_migrate(repo, &mount_path, restic_bin, cfg, audit);

    cleanup_unmount(repo);
    if let Err(err) = mount_dir.close() {
        warn::emit(WarnEvent {
            code: "TEMPDIR_REMOVE_FAILED",
            stage: "cleanup",
            action: "remove-mount-dir",
            archive: "",
            path: &mount_path.display().to_string(),
            reason: "tempdir-remove-failed",
            err: &err.to_string(),
        });
    }

    let migrated = result?;
    Ok(MigrationOutcome {
        mount_dir: mount_path,
        planned,
        migrated,
    })
}
