use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

use crate::borg::timestamp::NaiveZone;
use crate::error::MigrateError;
use crate::process;

/// One entry of `borg list --json`, as borg prints it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawArchive {
    pub archive: String,
    pub id: String,
    pub name: String,
    pub start: String,
    pub time: String,
}

#[derive(Debug, Deserialize)]
struct ArchiveListing {
    archives: Vec<RawArchive>,
}

/// An archive whose `start` and `time` fields both parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct BorgArchive {
    pub id: String,
    pub name: String,
    pub label: String,
    pub start_time: DateTime<Local>,
    pub recorded_time: DateTime<Local>,
}

impl BorgArchive {
    fn from_raw(raw: RawArchive, zone: NaiveZone) -> Result<Self> {
        let start_time = zone
            .parse(&raw.start)
            .context("unable to parse start field")?;
        let recorded_time = zone.parse(&raw.time).context("unable to parse time field")?;
        Ok(Self {
            id: raw.id,
            name: raw.name,
            label: raw.archive,
            start_time,
            recorded_time,
        })
    }
}

/// Build the catalog from listing JSON. All-or-nothing: the first archive
/// with an unparseable timestamp fails the whole listing.
pub fn parse_listing(raw: &[u8], zone: NaiveZone) -> Result<Vec<BorgArchive>> {
    let listing: ArchiveListing = serde_json::from_slice(raw)
        .map_err(|err| MigrateError::MalformedData(err.to_string()))
        .context("unable to deserialize borg list output")?;

    listing
        .archives
        .into_iter()
        .map(|raw| {
            let id = raw.id.clone();
            BorgArchive::from_raw(raw, zone)
                .with_context(|| format!("unable to parse timestamps for archive {id}"))
        })
        .collect()
}

pub fn load_catalog(borg_bin: &Path, zone: NaiveZone) -> Result<Vec<BorgArchive>> {
    let mut cmd = Command::new(borg_bin);
    cmd.arg("list").arg("--json");
    let output = process::output_checked(&mut cmd).context("unable to run borg list")?;
    parse_listing(&output.stdout, zone)
}
