use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::migrate::config::{ConfigOverrides, load_config};
use crate::migrate::tools::{BORG_BIN_VAR, FUSERMOUNT_BIN_VAR, RESTIC_BIN_VAR, resolve_bin};

const REQUIRED_ENV: &[&str] = &["BORG_REPO", "RESTIC_REPOSITORY"];
// either may come from a password file or command instead
const CREDENTIAL_ENV: &[&str] = &["BORG_PASSPHRASE", "RESTIC_PASSWORD"];

fn env_is_set(var: &str) -> bool {
    env::var(var).is_ok_and(|v| !v.trim().is_empty())
}

pub fn run(overrides: &ConfigOverrides) -> Result<CommandReport> {
    let mut report = CommandReport::new("status");

    for (var, name) in [
        (BORG_BIN_VAR, "borg"),
        (RESTIC_BIN_VAR, "restic"),
        (FUSERMOUNT_BIN_VAR, "fusermount"),
    ] {
        match resolve_bin(var, name) {
            Ok(path) => report.detail(format!("{name}={}", path.display())),
            Err(err) => report.issue(format!("{err:#}")),
        }
    }

    for var in REQUIRED_ENV {
        if env_is_set(var) {
            report.detail(format!("{var} is set"));
        } else {
            report.issue(format!("{var} is not set"));
        }
    }
    for var in CREDENTIAL_ENV {
        let state = if env_is_set(var) { "set" } else { "unset" };
        report.detail(format!("{var} is {state}"));
    }

    match load_config(overrides) {
        Ok(cfg) => {
            report.detail(format!("archive_prefix={:?}", cfg.archive_prefix));
            report.detail(format!(
                "sub_path={}",
                cfg.sub_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".to_string())
            ));
            report.detail(format!("hostname={}", cfg.hostname.as_deref().unwrap_or("-")));
            report.detail(format!("set_path={}", cfg.set_path.as_deref().unwrap_or("-")));
            match cfg.naive_zone() {
                Ok(zone) => report.detail(format!("timezone={}", zone.name())),
                Err(err) => report.issue(format!("{err:#}")),
            }
            report.detail(format!("progress={}", cfg.progress));
        }
        Err(err) => report.issue(format!("config invalid: {err:#}")),
    }

    Ok(report)
}
