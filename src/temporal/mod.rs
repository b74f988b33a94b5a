//! Date/time normalization.
//!
//! Everything the classifier (or a client) sends as a date passes through here before it
//! is stored: the output is always an absolute UTC instant, never a naive value.

use chrono::{
    DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta,
    TimeZone, Utc,
};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, warn};

const AWARE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

const TIME_OF_DAY_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized date format: {raw:?}")]
pub struct NormalizationFailure {
    pub raw: String,
}

enum Parsed {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

/// Resolves an IANA zone name, falling back to UTC for anything unknown.
pub fn resolve_timezone(name: &str) -> Tz {
    match name.trim().parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!("unknown timezone '{}', falling back to UTC", name);
            Tz::UTC
        }
    }
}

/// Parses `raw` into a UTC instant.
///
/// Empty input yields `Ok(None)`. Values without an offset are read as wall-clock time in
/// `reference_timezone`; values with an offset ignore it. Date-only values land on local
/// noon so that all-day items keep their calendar day in every zone.
pub fn normalize(
    raw: &str,
    reference_timezone: &str,
) -> Result<Option<DateTime<Utc>>, NormalizationFailure> {
    let trimmed = raw.trim();
    debug!("normalizing '{}' (reference zone '{}')", trimmed, reference_timezone);

    if trimmed.is_empty() {
        return Ok(None);
    }

    let parsed = parse_iso(trimmed)
        .or_else(|| parse_month_day_year(trimmed).map(Parsed::Naive))
        .ok_or_else(|| NormalizationFailure {
            raw: trimmed.to_string(),
        })?;

    let instant = match parsed {
        Parsed::Aware(dt) => dt.with_timezone(&Utc),
        Parsed::Naive(naive) => localize(naive, resolve_timezone(reference_timezone)),
    };

    debug!("normalized '{}' to {}", trimmed, instant.to_rfc3339());
    Ok(Some(instant))
}

/// Like [`normalize`], but a malformed value degrades to "no date".
pub fn normalize_lenient(raw: &str, reference_timezone: &str) -> Option<DateTime<Utc>> {
    match normalize(raw, reference_timezone) {
        Ok(instant) => instant,
        Err(err) => {
            debug!("treating due date as absent: {}", err);
            None
        }
    }
}

/// Calendar date of `raw` as seen in `reference_timezone`.
pub fn normalize_to_local_date(raw: &str, reference_timezone: &str) -> Option<NaiveDate> {
    normalize_lenient(raw, reference_timezone)
        .map(|instant| local_date(instant, resolve_timezone(reference_timezone)))
}

/// Interprets a naive wall-clock value in `tz`.
///
/// An ambiguous local time (clocks going back) resolves to the standard-time instant; a
/// local time inside a gap (clocks going forward) uses the offset from before the gap.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(_, later) => later.with_timezone(&Utc),
        LocalResult::None => {
            let before_gap = tz
                .offset_from_utc_datetime(&(naive - TimeDelta::days(1)))
                .fix();
            let utc = naive - TimeDelta::seconds(i64::from(before_gap.local_minus_utc()));
            Utc.from_utc_datetime(&utc)
        }
    }
}

pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Today's calendar date for someone living in `tz`.
pub fn today_in(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    local_date(now, tz)
}

/// Parses `HH:MM` or `HH:MM:SS` (fractional seconds allowed).
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    TIME_OF_DAY_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
}

fn parse_iso(raw: &str) -> Option<Parsed> {
    let value = match raw.strip_suffix('Z') {
        Some(rest) => format!("{rest}+00:00"),
        None => raw.to_string(),
    };

    if value.contains('T') {
        parse_date_time(&value)
    } else {
        NaiveDate::parse_from_str(&value, "%Y-%m-%d")
            .ok()
            .and_then(at_noon)
            .map(Parsed::Naive)
    }
}

fn parse_date_time(value: &str) -> Option<Parsed> {
    if let Some(dt) = AWARE_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(value, fmt).ok())
    {
        return Some(Parsed::Aware(dt));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(Parsed::Naive)
}

// Legacy MM/DD/YYYY.
fn parse_month_day_year(raw: &str) -> Option<NaiveDateTime> {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 3 {
        return None;
    }

    let month: u32 = parts[0].trim().parse().ok()?;
    let day: u32 = parts[1].trim().parse().ok()?;
    let year: i32 = parts[2].trim().parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day).and_then(at_noon)
}

fn at_noon(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(12, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("valid rfc3339")
            .with_timezone(&Utc)
    }

    #[test]
    fn date_only_lands_on_local_noon() {
        let result = normalize("2025-06-17", "America/New_York").unwrap();
        assert_eq!(result, Some(utc("2025-06-17T16:00:00Z")));
    }

    #[test]
    fn date_only_keeps_calendar_day_in_far_zones() {
        for zone in ["Pacific/Kiritimati", "Pacific/Pago_Pago", "Asia/Kolkata", "UTC"] {
            let tz = resolve_timezone(zone);
            let instant = normalize("2025-03-01", zone).unwrap().unwrap();
            let local = instant.with_timezone(&tz).naive_local();
            assert_eq!(
                local,
                NaiveDate::from_ymd_opt(2025, 3, 1)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap(),
                "zone {zone}"
            );
        }
    }

    #[test]
    fn z_suffix_is_utc() {
        let result = normalize("2025-06-17T15:30:00Z", "Asia/Tokyo").unwrap();
        assert_eq!(result, Some(utc("2025-06-17T15:30:00Z")));
    }

    #[test]
    fn explicit_offset_ignores_reference_zone() {
        let a = normalize("2025-06-17T15:30:00+05:30", "America/New_York").unwrap();
        let b = normalize("2025-06-17T15:30:00+05:30", "Europe/Berlin").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Some(utc("2025-06-17T10:00:00Z")));
    }

    #[test]
    fn naive_date_time_uses_reference_zone() {
        let result = normalize("2025-01-10T09:00:00", "Europe/Berlin").unwrap();
        assert_eq!(result, Some(utc("2025-01-10T08:00:00Z")));

        let without_seconds = normalize("2025-01-10T09:00", "Europe/Berlin").unwrap();
        assert_eq!(without_seconds, result);
    }

    #[test]
    fn month_day_year_fallback() {
        let result = normalize("06/17/2025", "America/New_York").unwrap();
        assert_eq!(result, Some(utc("2025-06-17T16:00:00Z")));
    }

    #[test]
    fn empty_input_is_absent() {
        assert_eq!(normalize("", "UTC"), Ok(None));
        assert_eq!(normalize("   ", "UTC"), Ok(None));
    }

    #[test]
    fn garbage_is_a_failure_and_lenient_is_absent() {
        assert!(normalize("not-a-date", "UTC").is_err());
        assert!(normalize("13/45/2025", "UTC").is_err());
        assert!(normalize("2025-02-30", "UTC").is_err());
        assert_eq!(normalize_lenient("not-a-date", "UTC"), None);
    }

    #[test]
    fn unknown_zone_falls_back_to_utc() {
        let result = normalize("2025-06-17", "Mars/Olympus_Mons").unwrap();
        assert_eq!(result, Some(utc("2025-06-17T12:00:00Z")));
    }

    #[test]
    fn output_is_a_fixed_point() {
        for (raw, zone) in [
            ("2025-06-17", "America/New_York"),
            ("2025-06-17T23:45:00", "Asia/Tokyo"),
            ("12/31/2024", "Australia/Sydney"),
            ("2025-06-17T15:30:00.250+02:00", "UTC"),
        ] {
            let first = normalize(raw, zone).unwrap().unwrap();
            let second = normalize(&first.to_rfc3339(), zone).unwrap().unwrap();
            assert_eq!(first, second, "{raw} in {zone}");
        }
    }

    #[test]
    fn ambiguous_wall_time_prefers_standard_time() {
        // 01:30 happens twice on 2025-11-02 in New York; EST is UTC-5.
        let result = normalize("2025-11-02T01:30:00", "America/New_York").unwrap();
        assert_eq!(result, Some(utc("2025-11-02T06:30:00Z")));
    }

    #[test]
    fn wall_time_in_gap_uses_offset_before_gap() {
        // 02:30 does not exist on 2025-03-09 in New York; before the gap it is EST.
        let result = normalize("2025-03-09T02:30:00", "America/New_York").unwrap();
        assert_eq!(result, Some(utc("2025-03-09T07:30:00Z")));
    }

    #[test]
    fn local_date_follows_zone() {
        let instant = utc("2025-06-17T02:00:00Z");
        let ny = resolve_timezone("America/New_York");
        assert_eq!(local_date(instant, ny), NaiveDate::from_ymd_opt(2025, 6, 16).unwrap());
        assert_eq!(
            normalize_to_local_date("2025-06-17", "America/New_York"),
            NaiveDate::from_ymd_opt(2025, 6, 17)
        );
    }

    #[test]
    fn time_of_day_parsing() {
        assert_eq!(parse_time_of_day("07:30"), NaiveTime::from_hms_opt(7, 30, 0));
        assert_eq!(parse_time_of_day("18:05:09"), NaiveTime::from_hms_opt(18, 5, 9));
        assert_eq!(parse_time_of_day("25:00"), None);
        assert_eq!(parse_time_of_day("soon"), None);
    }
}
