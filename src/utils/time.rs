use chrono::{DateTime, Duration, Local, NaiveDateTime, SecondsFormat, Utc};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Stored timestamps are fixed-width RFC 3339 UTC, so string order is time order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 as well as the naive local `isoformat()` strings written by
/// older ClipStack stores.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())?;
    let local = naive
        .and_local_timezone(Local)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc());
    Some(local)
}

pub fn normalize_timestamp(raw: &str) -> Option<String> {
    parse_timestamp(raw).map(format_timestamp)
}

/// Returns a timestamp strictly after `newest`, preferring the wall clock.
pub fn next_timestamp(now: DateTime<Utc>, newest: Option<&str>) -> String {
    let floor = newest
        .and_then(parse_timestamp)
        .map(|at| at + Duration::microseconds(1));
    match floor {
        Some(floor) if floor > now => format_timestamp(floor),
        _ => format_timestamp(now),
    }
}
