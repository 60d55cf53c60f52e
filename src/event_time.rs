use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Source of "now" for the pipeline.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Epoch values at or above this are taken as milliseconds (year 2001 in ms, year 33658 in s).
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Unix seconds for the purchase: the caller's `event_time` when it parses,
/// otherwise `now`. Parse failures are logged and never surfaced.
pub fn resolve_event_time(raw: Option<&Value>, now: DateTime<Utc>) -> i64 {
    let parsed = match raw {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64().and_then(|v| from_epoch(v as i64)),
        Some(Value::String(s)) => parse_event_time(s),
        Some(other) => {
            tracing::debug!("Ignoring non-scalar event_time: {}", other);
            None
        }
    };

    match parsed {
        Some(ts) => ts.timestamp(),
        None => {
            if raw.is_some_and(|v| !v.is_null()) {
                tracing::warn!("Unparseable event_time {:?}, using current time", raw);
            }
            now.timestamp()
        }
    }
}

/// Parses the date/time shapes spreadsheets and automation tools send.
fn parse_event_time(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(from_epoch);
    }

    // Offset-aware shapes first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(dt.with_timezone(&Utc));
    }
    // `Wed May 01 2024 10:00:00 GMT-0300 (Argentina Standard Time)`, as
    // spreadsheet scripts stringify dates; the zone name is informational
    let without_zone_name = s.split(" (").next().unwrap_or(s);
    if let Ok(dt) = DateTime::parse_from_str(without_zone_name, "%a %b %d %Y %H:%M:%S GMT%z") {
        return Some(dt.with_timezone(&Utc));
    }

    // Naive values are assumed UTC
    const NAIVE_FORMATS: [&str; 7] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value >= MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}
