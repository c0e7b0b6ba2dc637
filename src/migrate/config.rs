use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::borg::timestamp::NaiveZone;
use crate::restic::BackupOverrides;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateConfig {
    pub archive_prefix: String,
    pub sub_path: Option<PathBuf>,
    pub hostname: Option<String>,
    pub set_path: Option<String>,
    pub timezone: Option<String>,
    pub progress: bool,
    pub audit_log: Option<PathBuf>,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            archive_prefix: String::new(),
            sub_path: None,
            hostname: None,
            set_path: None,
            timezone: None,
            progress: true,
            audit_log: None,
        }
    }
}

impl MigrateConfig {
    pub fn naive_zone(&self) -> Result<NaiveZone> {
        match &self.timezone {
            Some(name) => NaiveZone::from_name(name),
            None => Ok(NaiveZone::Local),
        }
    }

    pub fn backup_overrides(&self) -> BackupOverrides {
        BackupOverrides {
            hostname: self.hostname.clone(),
            set_path: self.set_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialMigrateConfig {
    archive_prefix: Option<String>,
    sub_path: Option<PathBuf>,
    hostname: Option<String>,
    set_path: Option<String>,
    timezone: Option<String>,
    progress: Option<bool>,
    audit_log: Option<PathBuf>,
}

/// Values given on the command line; `None` keeps the layered value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub archive_prefix: Option<String>,
    pub sub_path: Option<PathBuf>,
    pub hostname: Option<String>,
    pub set_path: Option<String>,
    pub timezone: Option<String>,
    pub no_progress: bool,
    pub audit_log: Option<PathBuf>,
}

fn env_opt_string(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Re-root `raw` under the archive directory. Borg stores paths without a
/// leading slash, so `/home/me` and `home/me` name the same place.
pub fn normalize_sub_path(raw: &Path) -> Result<Option<PathBuf>> {
    let mut out = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                return Err(anyhow!(
                    "invalid sub path {}: `..` would leave the archive",
                    raw.display()
                ));
            }
            Component::Prefix(_) => {
                return Err(anyhow!("invalid sub path {}: drive prefix", raw.display()));
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Ok(None);
    }
    Ok(Some(out))
}

fn validate(cfg: &mut MigrateConfig) -> Result<()> {
    if let Some(raw) = cfg.sub_path.take() {
        cfg.sub_path = normalize_sub_path(&raw)?;
    }
    if cfg.hostname.as_deref().is_some_and(|h| h.trim().is_empty()) {
        return Err(anyhow!("invalid hostname: cannot be blank"));
    }
    if cfg.set_path.as_deref().is_some_and(|p| p.trim().is_empty()) {
        return Err(anyhow!("invalid set path: cannot be blank"));
    }
    cfg.naive_zone()?;
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Some(custom) = env_opt_string("B2R_CONFIG_PATH") {
        return Some(PathBuf::from(custom));
    }

    let base = dirs::config_dir()?;
    Some(base.join("borg2restic").join("config.toml"))
}

fn merge_file_config(base: &mut MigrateConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: PartialMigrateConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(prefix) = parsed.archive_prefix {
        base.archive_prefix = prefix;
    }
    if parsed.sub_path.is_some() {
        base.sub_path = parsed.sub_path;
    }
    if parsed.hostname.is_some() {
        base.hostname = parsed.hostname;
    }
    if parsed.set_path.is_some() {
        base.set_path = parsed.set_path;
    }
    if parsed.timezone.is_some() {
        base.timezone = parsed.timezone;
    }
    if let Some(progress) = parsed.progress {
        base.progress = progress;
    }
    if parsed.audit_log.is_some() {
        base.audit_log = parsed.audit_log;
    }
    Ok(())
}

fn merge_env(cfg: &mut MigrateConfig) {
    if let Some(prefix) = env_opt_string("B2R_ARCHIVE_PREFIX") {
        cfg.archive_prefix = prefix;
    }
    if let Some(sub_path) = env_opt_string("B2R_SUB_PATH") {
        cfg.sub_path = Some(PathBuf::from(sub_path));
    }
    if let Some(hostname) = env_opt_string("B2R_HOSTNAME") {
        cfg.hostname = Some(hostname);
    }
    if let Some(set_path) = env_opt_string("B2R_SET_PATH") {
        cfg.set_path = Some(set_path);
    }
    if let Some(timezone) = env_opt_string("B2R_TIMEZONE") {
        cfg.timezone = Some(timezone);
    }
    cfg.progress = env_or_bool("B2R_PROGRESS", cfg.progress);
    if let Some(audit_log) = env_opt_string("B2R_AUDIT_LOG") {
        cfg.audit_log = Some(PathBuf::from(audit_log));
    }
}

fn merge_overrides(cfg: &mut MigrateConfig, overrides: &ConfigOverrides) {
    if let Some(prefix) = &overrides.archive_prefix {
        cfg.archive_prefix = prefix.clone();
    }
    if let Some(sub_path) = &overrides.sub_path {
        cfg.sub_path = Some(sub_path.clone());
    }
    if let Some(hostname) = &overrides.hostname {
        cfg.hostname = Some(hostname.clone());
    }
    if let Some(set_path) = &overrides.set_path {
        cfg.set_path = Some(set_path.clone());
    }
    if let Some(timezone) = &overrides.timezone {
        cfg.timezone = Some(timezone.clone());
    }
    if overrides.no_progress {
        cfg.progress = false;
    }
    if let Some(audit_log) = &overrides.audit_log {
        cfg.audit_log = Some(audit_log.clone());
    }
}

pub fn load_config(overrides: &ConfigOverrides) -> Result<MigrateConfig> {
    let mut cfg = MigrateConfig::default();
    if let Some(path) = resolve_config_path() {
        merge_file_config(&mut cfg, &path)?;
    }
    merge_env(&mut cfg);
    merge_overrides(&mut cfg, overrides);

    validate(&mut cfg)?;
    Ok(cfg)
}
