//! Parsing of LDAP generalized time values such as `pwdchangedtime`.

use chrono::{DateTime, FixedOffset, Utc};

/// Parses a generalized time into UTC.
///
/// Accepts `YYYYMMDDHH[MM[SS[.fff]]]` followed by `Z`, `±HH` or `±HHMM`. Omitted minutes and
/// seconds are zero. RFC 3339 timestamps are accepted as well, since some proxies rewrite
/// operational attributes into that form.
#[must_use]
pub fn parse_generalized_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    parse_generalized(value)
        .or_else(|| DateTime::parse_from_rfc3339(value).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_generalized(value: &str) -> Option<DateTime<FixedOffset>> {
    let (local, offset) = match value.strip_suffix(['Z', 'z']) {
        Some(local) => (local, "+0000".to_string()),
        None => {
            let (local, offset) = value.split_at(value.rfind(['+', '-'])?);
            match offset.len() {
                3 => (local, format!("{offset}00")),
                5 => (local, offset.to_string()),
                _ => return None,
            }
        }
    };

    let local = local.replace(',', ".");
    let (digits, fraction) = local.split_at(local.find('.').unwrap_or(local.len()));
    let seconds = match digits.len() {
        10 if fraction.is_empty() => format!("{digits}0000"),
        12 if fraction.is_empty() => format!("{digits}00"),
        14 => digits.to_string(),
        _ => return None,
    };

    DateTime::parse_from_str(&format!("{seconds}{fraction}{offset}"), "%Y%m%d%H%M%S%.f%z").ok()
}
