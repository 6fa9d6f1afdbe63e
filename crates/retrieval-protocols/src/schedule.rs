//! Schedule Evaluator
//!
//! Parses 5-field (minute granularity) or 6-field (second granularity)
//! cron expressions in a named timezone and computes the next UTC
//! instant strictly after a reference instant. The `cron` crate's
//! grammar always expects a leading seconds field, so a 5-field input is
//! normalized by prepending `"0"` before parsing.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;

/// A small number of common Windows zone names this evaluator resolves
/// in addition to IANA identifiers. Not exhaustive — operators are
/// expected to configure IANA `Area/City` names; these cover the
/// handful of Windows names seen in practice from upstream scheduling
/// tools.
const WINDOWS_ZONE_ALIASES: &[(&str, &str)] = &[
    ("UTC", "UTC"),
    ("GMT Standard Time", "Europe/London"),
    ("Eastern Standard Time", "America/New_York"),
    ("Central Standard Time", "America/Chicago"),
    ("Mountain Standard Time", "America/Denver"),
    ("Pacific Standard Time", "America/Los_Angeles"),
    ("W. Europe Standard Time", "Europe/Berlin"),
    ("India Standard Time", "Asia/Kolkata"),
    ("China Standard Time", "Asia/Shanghai"),
    ("Tokyo Standard Time", "Asia/Tokyo"),
    ("AUS Eastern Standard Time", "Australia/Sydney"),
];

/// Resolves a timezone identifier, trying IANA first and the Windows
/// alias table second.
fn resolve_timezone(identifier: &str) -> Option<Tz> {
    if let Ok(tz) = Tz::from_str(identifier) {
        return Some(tz);
    }
    WINDOWS_ZONE_ALIASES
        .iter()
        .find(|(windows_name, _)| windows_name.eq_ignore_ascii_case(identifier))
        .and_then(|(_, iana_name)| Tz::from_str(iana_name).ok())
}

/// Normalizes a 5- or 6-field cron expression into the 6-field
/// (seconds-first) form the `cron` crate parses.
fn normalize_cron_fields(expression: &str) -> String {
    let field_count = expression.split_whitespace().count();
    if field_count == 5 {
        format!("0 {expression}")
    } else {
        expression.to_string()
    }
}

/// Validates that `expression` is a parseable 5- or 6-field cron expression
#[must_use]
pub fn is_valid_cron(expression: &str) -> bool {
    CronSchedule::from_str(&normalize_cron_fields(expression)).is_ok()
}

/// Validates that `identifier` resolves to a known timezone
#[must_use]
pub fn is_valid_timezone(identifier: &str) -> bool {
    resolve_timezone(identifier).is_some()
}

/// Computes the next UTC instant strictly after `reference` at which
/// `expression` (evaluated in `timezone`) fires. Returns `None` if the
/// expression never fires again or fails to parse/resolve.
#[must_use]
pub fn next_after(expression: &str, timezone: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let schedule = CronSchedule::from_str(&normalize_cron_fields(expression)).ok()?;
    let tz = resolve_timezone(timezone)?;
    let reference_in_tz = reference.with_timezone(&tz);
    schedule
        .after(&reference_in_tz)
        .next()
        .map(|next| next.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_valid_five_field_cron() {
        assert!(is_valid_cron("*/5 * * * *"));
    }

    #[test]
    fn test_valid_six_field_cron() {
        assert!(is_valid_cron("*/5 * * * * *"));
    }

    #[test]
    fn test_invalid_cron_rejected() {
        assert!(!is_valid_cron("not a cron expression"));
    }

    #[test]
    fn test_valid_iana_timezone() {
        assert!(is_valid_timezone("America/New_York"));
    }

    #[test]
    fn test_valid_windows_timezone_alias() {
        assert!(is_valid_timezone("Eastern Standard Time"));
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        assert!(!is_valid_timezone("Not/AZone"));
    }

    #[test]
    fn test_next_after_every_five_seconds() {
        let reference = Utc.with_ymd_and_hms(2025, 1, 24, 10, 0, 1).unwrap();
        let next = next_after("*/5 * * * * *", "UTC", reference).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 24, 10, 0, 5).unwrap());
    }

    #[test]
    fn test_next_after_is_strictly_after_minute_boundary() {
        let reference = Utc.with_ymd_and_hms(2025, 1, 24, 10, 0, 0).unwrap();
        let next = next_after("0 * * * *", "UTC", reference).unwrap();
        assert!(next > reference);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 24, 11, 0, 0).unwrap());
    }

    #[test]
    fn test_next_after_unknown_timezone_returns_none() {
        assert!(next_after("* * * * *", "Not/AZone", Utc::now()).is_none());
    }
}
