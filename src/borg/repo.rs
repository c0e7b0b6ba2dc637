use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::borg::archive::{self, BorgArchive};
use crate::borg::timestamp::NaiveZone;
use crate::error::MigrateError;
use crate::process;

/// Handle on the borg repository named by `$BORG_REPO`.
///
/// Holds the catalog and at most one active FUSE mount.
#[derive(Debug)]
pub struct BorgRepo {
    archives: Vec<BorgArchive>,
    mount_point: Option<PathBuf>,
    borg_bin: PathBuf,
    fusermount_bin: PathBuf,
}

impl BorgRepo {
    pub fn new(archives: Vec<BorgArchive>, borg_bin: &Path, fusermount_bin: &Path) -> Self {
        Self {
            archives,
            mount_point: None,
            borg_bin: borg_bin.to_path_buf(),
            fusermount_bin: fusermount_bin.to_path_buf(),
        }
    }

    pub fn load(borg_bin: &Path, fusermount_bin: &Path, zone: NaiveZone) -> Result<Self> {
        let archives = archive::load_catalog(borg_bin, zone)?;
        Ok(Self::new(archives, borg_bin, fusermount_bin))
    }

    pub fn archives(&self) -> &[BorgArchive] {
        &self.archives
    }

    pub fn mount_point(&self) -> Option<&Path> {
        self.mount_point.as_deref()
    }

    pub fn is_mounted(&self) -> bool {
        self.mount_point.is_some()
    }

    /// Mount every archive of the repository under `dest`, one directory
    /// per archive name.
    ///
    /// `dest` is claimed before borg runs. A failed mount releases the claim,
    /// so the handle reads as not mounted afterwards.
    pub fn mount(&mut self, dest: &Path) -> Result<()> {
        if let Some(current) = &self.mount_point {
            return Err(MigrateError::LifecycleMisuse(format!(
                "already mounted at {}",
                current.display()
            ))
            .into());
        }

        let mut cmd = Command::new(&self.borg_bin);
        cmd.args(["mount", "-o", "ignore_permissions", "::"]).arg(dest);
        eprintln!("{}", process::describe(&cmd));

        self.mount_point = Some(dest.to_path_buf());
        if let Err(err) = process::run_checked(&mut cmd) {
            self.mount_point = None;
            return Err(err).with_context(|| format!("unable to mount repo to {}", dest.display()));
        }
        Ok(())
    }

    /// Release the active mount. On failure the mount point stays recorded
    /// so the caller may retry.
    pub fn unmount(&mut self) -> Result<()> {
        let Some(mount_point) = &self.mount_point else {
            return Err(MigrateError::LifecycleMisuse("nothing mounted".to_string()).into());
        };

        let mut cmd = Command::new(&self.fusermount_bin);
        cmd.arg("-u").arg(mount_point);
        process::run_checked(&mut cmd)
            .with_context(|| format!("unable to unmount {}", mount_point.display()))?;

        self.mount_point = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_script(path: &Path, body: &str) {
        fs::write(path, format!("#!/usr/bin/env bash\n{body}\n")).expect("write script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path).expect("metadata").permissions();
            perms.set_mode(0o755);
            fs::set_permissions(path, perms).expect("chmod");
        }
    }

    fn lifecycle_error(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<MigrateError>(),
            Some(MigrateError::LifecycleMisuse(_))
        )
    }

    #[test]
    fn second_mount_without_unmount_is_misuse() {
        let tmp = tempdir().expect("tempdir");
        let borg = tmp.path().join("borg");
        let fusermount = tmp.path().join("fusermount");
        write_script(&borg, "exit 0");
        write_script(&fusermount, "exit 0");
        let mount_dir = tmp.path().join("mnt");
        fs::create_dir_all(&mount_dir).expect("mkdir mnt");

        let mut repo = BorgRepo::new(Vec::new(), &borg, &fusermount);
        repo.mount(&mount_dir).expect("first mount");
        assert_eq!(repo.mount_point(), Some(mount_dir.as_path()));

        let err = repo.mount(&mount_dir).expect_err("second mount must fail");
        assert!(lifecycle_error(&err));
        assert!(err.to_string().contains("already mounted"));

        repo.unmount().expect("unmount");
        assert!(!repo.is_mounted());
        repo.mount(&mount_dir).expect("mount again after unmount");
    }

    #[test]
    fn unmount_without_mount_is_misuse() {
        let mut repo = BorgRepo::new(Vec::new(), Path::new("borg"), Path::new("fusermount"));
        let err = repo.unmount().expect_err("must fail");
        assert!(lifecycle_error(&err));
        assert_eq!(err.to_string(), "nothing mounted");
    }

    #[test]
    fn failed_mount_leaves_handle_unmounted() {
        let tmp = tempdir().expect("tempdir");
        let borg = tmp.path().join("borg");
        write_script(&borg, "exit 2");

        let mut repo = BorgRepo::new(Vec::new(), &borg, Path::new("fusermount"));
        let err = repo.mount(tmp.path()).expect_err("mount must fail");
        assert!(matches!(
            err.downcast_ref::<MigrateError>(),
            Some(MigrateError::ExternalProcess { .. })
        ));
        assert!(!repo.is_mounted());
    }

    #[test]
    fn failed_unmount_keeps_mount_point_for_retry() {
        let tmp = tempdir().expect("tempdir");
        let borg = tmp.path().join("borg");
        let fusermount = tmp.path().join("fusermount");
        write_script(&borg, "exit 0");
        write_script(&fusermount, "exit 1");

        let mut repo = BorgRepo::new(Vec::new(), &borg, &fusermount);
        repo.mount(tmp.path()).expect("mount");
        assert!(repo.unmount().is_err());
        assert_eq!(repo.mount_point(), Some(tmp.path()));
    }

    #[test]
    fn mount_exposes_whole_repository() {
        let tmp = tempdir().expect("tempdir");
        let borg = tmp.path().join("borg");
        let log = tmp.path().join("borg.log");
        write_script(&borg, &format!("printf '%s\\n' \"$*\" >> '{}'", log.display()));

        let mut repo = BorgRepo::new(Vec::new(), &borg, Path::new("fusermount"));
        repo.mount(Path::new("/mnt/b2r")).expect("mount");
        let logged = fs::read_to_string(&log).expect("read log");
        assert_eq!(logged.trim(), "mount -o ignore_permissions :: /mnt/b2r");
    }
}
