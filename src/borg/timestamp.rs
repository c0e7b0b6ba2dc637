//! Borg timestamp parsing.
//!
//! Borg has written archive times in two layouts over its lifetime:
//! `2022-08-12T21:19:37.878526+02:00` (current, explicit offset) and
//! `2016-06-01T00:00:00.000000` (older releases, no offset).

use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::error::MigrateError;

const LAYOUT_NEW: &str = "%Y-%m-%dT%H:%M:%S%.6f%:z";
const LAYOUT_OLD: &str = "%Y-%m-%dT%H:%M:%S%.6f";
// byte offset of the `.` after `YYYY-MM-DDThh:mm:ss`
const FRACTION_START: usize = 19;

/// chrono treats `%.6f` as optional when parsing; both layouts require
/// exactly six fractional digits.
fn has_micro_fraction(input: &str) -> bool {
    let bytes = input.as_bytes();
    let digits = FRACTION_START + 1..FRACTION_START + 7;
    bytes.get(FRACTION_START) == Some(&b'.')
        && bytes
            .get(digits)
            .is_some_and(|d| d.iter().all(u8::is_ascii_digit))
        && !bytes
            .get(FRACTION_START + 7)
            .is_some_and(u8::is_ascii_digit)
}

/// Zone used to interpret timestamps that carry no offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NaiveZone {
    #[default]
    Local,
    Named(Tz),
}

impl NaiveZone {
    pub fn from_name(name: &str) -> anyhow::Result<Self> {
        let tz = name
            .trim()
            .parse::<Tz>()
            .map_err(|err| anyhow::anyhow!("unknown timezone `{}`: {err}", name.trim()))?;
        Ok(Self::Named(tz))
    }

    pub fn name(&self) -> String {
        match self {
            Self::Local => "local".to_string(),
            Self::Named(tz) => tz.name().to_string(),
        }
    }

    pub fn parse(&self, input: &str) -> Result<DateTime<Local>, MigrateError> {
        match self {
            Self::Local => parse_borg_timestamp(input),
            Self::Named(tz) => parse_borg_timestamp_in(input, tz),
        }
    }
}

/// Parse a borg timestamp, reading offset-less values as local time.
pub fn parse_borg_timestamp(input: &str) -> Result<DateTime<Local>, MigrateError> {
    parse_borg_timestamp_in(input, &Local)
}

/// Parse a borg timestamp, reading offset-less values in `zone`.
///
/// An explicit offset always wins over `zone`. The returned instant is
/// expressed in the local zone either way.
pub fn parse_borg_timestamp_in<Z: TimeZone>(
    input: &str,
    zone: &Z,
) -> Result<DateTime<Local>, MigrateError> {
    let fail = |reason: String| MigrateError::TimestampParse {
        input: input.to_string(),
        reason,
    };
    if !has_micro_fraction(input) {
        return Err(fail(
            "expected `.ffffff` microseconds after the seconds".to_string(),
        ));
    }

    let new_err = match DateTime::parse_from_str(input, LAYOUT_NEW) {
        Ok(parsed) => return Ok(parsed.with_timezone(&Local)),
        Err(err) => err,
    };

    let naive = NaiveDateTime::parse_from_str(input, LAYOUT_OLD)
        .map_err(|_| fail(new_err.to_string()))?;
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(t) => Ok(t.with_timezone(&Local)),
        // repeated wall-clock hour at a DST fold: take the first occurrence
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Local)),
        LocalResult::None => Err(fail(format!(
            "{naive} does not exist in the configured zone (daylight-saving gap)"
        ))),
    }
}
