use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_fake_borg(bin_path: &Path, log: &Path) {
    let script = format!(
        r#"#!/usr/bin/env bash
echo "borg $*" >> '{}'
if [[ "${{1:-}}" == "list" ]]; then
  echo '{{"archives":[{{"archive":"host-2020","id":"x1","name":"host-2020","start":"2020-01-02T03:04:05.000006+00:00","time":"2020-01-02T03:09:00.000000+00:00"}},{{"archive":"other","id":"x2","name":"other","start":"2020-02-02T03:04:05.000006","time":"2020-02-02T03:09:00.000000"}}]}}'
fi
"#,
        log.display()
    );
    fs::write(bin_path, script).expect("write fake borg");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(bin_path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(bin_path, perms).expect("chmod");
    }
}

#[test]
fn plan_lists_invocations_without_mounting() {
    let tmp = tempdir().expect("tempdir");
    let borg = tmp.path().join("borg");
    let log = tmp.path().join("borg.log");
    write_fake_borg(&borg, &log);

    assert_cmd::cargo::cargo_bin_cmd!("borg2restic")
        .current_dir(tmp.path())
        .env("TZ", "UTC")
        .env("B2R_CONFIG_PATH", tmp.path().join("absent.toml"))
        .env("BORG_BIN", &borg)
        .env("B2R_ARCHIVE_PREFIX", "host-")
        .env_remove("B2R_SUB_PATH")
        .env_remove("B2R_HOSTNAME")
        .env_remove("B2R_SET_PATH")
        .env_remove("B2R_TIMEZONE")
        .arg("plan")
        .args(["--hostname", "tp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("archives_listed=2"))
        .stdout(predicate::str::contains("archives_planned=1"))
        .stdout(predicate::str::contains(
            "host-2020 (id x1): cd $MOUNT/host-2020 && restic backup --force -H tp --time 2020-01-02 03:04:05 .",
        ))
        .stdout(predicate::str::contains("other (id x2)").not());

    let calls = fs::read_to_string(&log).expect("read borg log");
    assert_eq!(calls.trim(), "borg list --json");
}

#[test]
fn plan_reports_timezone_override_for_old_layout() {
    let tmp = tempdir().expect("tempdir");
    let borg = tmp.path().join("borg");
    write_fake_borg(&borg, &tmp.path().join("borg.log"));

    assert_cmd::cargo::cargo_bin_cmd!("borg2restic")
        .current_dir(tmp.path())
        .env("TZ", "UTC")
        .env("B2R_CONFIG_PATH", tmp.path().join("absent.toml"))
        .env("BORG_BIN", &borg)
        .env_remove("B2R_ARCHIVE_PREFIX")
        .env_remove("B2R_HOSTNAME")
        .args(["plan", "--archive-prefix", "other", "--timezone", "Europe/Berlin", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"command\": \"plan\""))
        .stdout(predicate::str::contains("--time 2020-02-02 02:04:05"));
}

#[test]
fn status_flags_missing_repository_variables() {
    let tmp = tempdir().expect("tempdir");
    let borg = tmp.path().join("borg");
    write_fake_borg(&borg, &tmp.path().join("borg.log"));

    assert_cmd::cargo::cargo_bin_cmd!("borg2restic")
        .current_dir(tmp.path())
        .env("B2R_CONFIG_PATH", tmp.path().join("absent.toml"))
        .env("BORG_BIN", &borg)
        .env("RESTIC_BIN", &borg)
        .env("FUSERMOUNT_BIN", &borg)
        .env("BORG_REPO", "/srv/borg")
        .env_remove("RESTIC_REPOSITORY")
        .env_remove("B2R_TIMEZONE")
        .arg("status")
        .assert()
        .failure()
        .stdout(predicate::str::contains("BORG_REPO is set"))
        .stdout(predicate::str::contains("! RESTIC_REPOSITORY is not set"))
        .stderr(predicate::str::contains("status finished with 1 issue(s)"));
}

#[test]
fn invalid_sub_path_is_rejected_before_listing() {
    let tmp = tempdir().expect("tempdir");
    let borg = tmp.path().join("borg");
    let log = tmp.path().join("borg.log");
    write_fake_borg(&borg, &log);

    assert_cmd::cargo::cargo_bin_cmd!("borg2restic")
        .current_dir(tmp.path())
        .env("B2R_CONFIG_PATH", tmp.path().join("absent.toml"))
        .env("BORG_BIN", &borg)
        .args(["plan", "--sub-path", "../etc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("would leave the archive"));

    assert!(!log.exists());
}

#[test]
fn config_file_supplies_prefix() {
    let tmp = tempdir().expect("tempdir");
    let borg = tmp.path().join("borg");
    write_fake_borg(&borg, &tmp.path().join("borg.log"));
    let config = tmp.path().join("config.toml");
    fs::write(&config, "archive_prefix = \"other\"\n").expect("write config");

    assert_cmd::cargo::cargo_bin_cmd!("borg2restic")
        .current_dir(tmp.path())
        .env("TZ", "UTC")
        .env("B2R_CONFIG_PATH", &config)
        .env("BORG_BIN", &borg)
        .env_remove("B2R_ARCHIVE_PREFIX")
        .env_remove("B2R_TIMEZONE")
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("archives_planned=1"))
        .stdout(predicate::str::contains("other (id x2)"));
}

#[test]
fn blank_prefix_env_keeps_file_prefix() {
    let tmp = tempdir().expect("tempdir");
    let borg = tmp.path().join("borg");
    write_fake_borg(&borg, &tmp.path().join("borg.log"));
    let config = tmp.path().join("config.toml");
    fs::write(&config, "archive_prefix = \"other\"\n").expect("write config");

    assert_cmd::cargo::cargo_bin_cmd!("borg2restic")
        .current_dir(tmp.path())
        .env("TZ", "UTC")
        .env("B2R_CONFIG_PATH", &config)
        .env("BORG_BIN", &borg)
        .env("B2R_ARCHIVE_PREFIX", "  ")
        .env_remove("B2R_TIMEZONE")
        .args(["--json", "plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"command\": \"plan\""))
        .stdout(predicate::str::contains("archives_planned=1"))
        .stdout(predicate::str::contains("other (id x2)"))
        .stdout(predicate::str::contains("host-2020 (id x1)").not());
}
