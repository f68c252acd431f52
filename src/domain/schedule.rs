//! Maintenance scheduling policy.
//!
//! Calendar dates only; time-of-day never enters these calculations.

use chrono::{Days, FixedOffset, NaiveDate, Utc};

/// Service interval applied when an asset has no frequency of its own.
pub const DEFAULT_FREQUENCY_DAYS: i32 = 180;

/// Wire format for every date crossing the HTTP boundary.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} format, expected YYYY-MM-DD")]
pub struct DateFormatError {
    pub field: &'static str,
}

/// Strict `YYYY-MM-DD` parse. Anything else, including timestamps, is rejected.
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, DateFormatError> {
    let value = value.trim();
    // chrono accepts unpadded components; the wire format is always 10 chars.
    if value.len() != 10 {
        return Err(DateFormatError { field });
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| DateFormatError { field })
}

/// Parses an optional date field. Absent and blank values are both `None`.
pub fn parse_optional_date(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, DateFormatError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_date(field, v).map(Some),
    }
}

#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Frequency actually used for scheduling; unset or non-positive falls back to the default.
#[must_use]
pub fn effective_frequency(frequency_days: Option<i32>) -> u32 {
    frequency_days
        .filter(|d| *d > 0)
        .and_then(|d| u32::try_from(d).ok())
        .unwrap_or(DEFAULT_FREQUENCY_DAYS.unsigned_abs())
}

/// `service_date + frequency`, saturating at the end of the calendar.
#[must_use]
pub fn next_service_due(service_date: NaiveDate, frequency_days: Option<i32>) -> NaiveDate {
    let days = Days::new(u64::from(effective_frequency(frequency_days)));
    service_date
        .checked_add_days(days)
        .unwrap_or(NaiveDate::MAX)
}

/// Resolves the dates of a new maintenance log.
///
/// `service_date` defaults to `today`; `next_service_due` defaults to
/// `service_date + frequency`.
#[must_use]
pub fn resolve_log_dates(
    service_date: Option<NaiveDate>,
    next_due: Option<NaiveDate>,
    frequency_days: Option<i32>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let service_date = service_date.unwrap_or(today);
    let next_due = next_due.unwrap_or_else(|| next_service_due(service_date, frequency_days));
    (service_date, next_due)
}

#[must_use]
pub fn is_overdue(next_due: Option<NaiveDate>, today: NaiveDate) -> bool {
    next_due.is_some_and(|d| d < today)
}

/// Today's date in UTC.
#[must_use]
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Today's date at a fixed UTC offset (minutes east of UTC).
#[must_use]
pub fn today_at_offset(offset_minutes: i32) -> NaiveDate {
    FixedOffset::east_opt(offset_minutes.saturating_mul(60)).map_or_else(today_utc, |tz| {
        Utc::now().with_timezone(&tz).date_naive()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn next_due_adds_frequency() {
        assert_eq!(
            next_service_due(date(2025, 8, 17), Some(180)),
            date(2026, 2, 13)
        );
        assert_eq!(next_service_due(date(2025, 1, 1), Some(90)), date(2025, 4, 1));
    }

    #[test]
    fn missing_frequency_uses_default() {
        assert_eq!(next_service_due(date(2025, 8, 17), None), date(2026, 2, 13));
        assert_eq!(next_service_due(date(2025, 8, 17), Some(0)), date(2026, 2, 13));
        assert_eq!(effective_frequency(Some(-5)), 180);
    }

    #[test]
    fn resolve_defaults_service_date_to_today() {
        let today = date(2025, 3, 1);
        let (service, due) = resolve_log_dates(None, None, Some(30), today);
        assert_eq!(service, today);
        assert_eq!(due, date(2025, 3, 31));
    }

    #[test]
    fn explicit_next_due_wins() {
        let explicit = date(2030, 1, 1);
        let (_, due) = resolve_log_dates(Some(date(2025, 1, 1)), Some(explicit), None, date(2025, 1, 1));
        assert_eq!(due, explicit);
    }

    #[test]
    fn strict_date_format() {
        assert_eq!(parse_date("service_date", "2025-08-17"), Ok(date(2025, 8, 17)));
        assert!(parse_date("service_date", "17/08/2025").is_err());
        assert!(parse_date("service_date", "2025-8-17").is_err());
        assert!(parse_date("service_date", "2025-08-17T10:00:00").is_err());
        assert!(parse_date("service_date", "2025-02-30").is_err());
        let err = parse_date("next_service_due", "tomorrow").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid next_service_due format, expected YYYY-MM-DD"
        );
    }

    #[test]
    fn blank_optional_date_is_none() {
        assert_eq!(parse_optional_date("d", None), Ok(None));
        assert_eq!(parse_optional_date("d", Some("  ")), Ok(None));
        assert_eq!(parse_optional_date("d", Some("2024-05-10")), Ok(Some(date(2024, 5, 10))));
    }

    #[test]
    fn overdue_starts_the_day_after_due() {
        let today = date(2025, 6, 1);
        assert!(!is_overdue(Some(today), today));
        assert!(is_overdue(Some(date(2025, 5, 31)), today));
        assert!(!is_overdue(Some(date(2025, 6, 2)), today));
        assert!(!is_overdue(None, today));
    }
}
