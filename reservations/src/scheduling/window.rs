//! Booking windows and the timestamp format they travel in.
//!
//! A window is stored and compared as a closed interval: a booking ending at 20:00 and one
//! starting at 20:00 on the same table collide. Durations are hours with at most one
//! fractional digit, each tenth worth six minutes.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive};

/// Rendering used for every timestamp leaving the service, e.g. `2026-05-01T19:30:00+00:00`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// `None` unless `end` is strictly after `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    /// Window starting at `start` and lasting `hours`; `None` for a negative, zero or too
    /// fine-grained duration.
    pub fn from_duration(start: DateTime<Utc>, hours: Decimal) -> Option<Self> {
        let minutes = duration_minutes(hours)?;
        Self::new(start, start.checked_add_signed(TimeDelta::try_minutes(minutes)?)?)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Closed-interval intersection.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

/// Convert a duration in hours to whole minutes: the integer part counts 60 minutes, the single
/// fractional digit 6 minutes per tenth.
pub fn duration_minutes(hours: Decimal) -> Option<i64> {
    let hours = hours.normalize();
    if hours.is_sign_negative() || hours.scale() > 1 {
        return None;
    }

    let whole = hours.trunc();
    let tenths = ((hours - whole) * Decimal::TEN).to_i64()?;
    Some(whole.to_i64()?.checked_mul(60)? + tenths * 6)
}

/// Parse an RFC 3339 timestamp with an explicit offset, normalize it to UTC and drop
/// sub-second precision.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim())?;
    Ok(parsed.with_timezone(&Utc).trunc_subsecs(0))
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 14, h, m, 0).unwrap()
    }

    fn hours(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    #[test]
    fn test_duration_decomposition() {
        assert_eq!(duration_minutes(hours("0.5")), Some(30));
        assert_eq!(duration_minutes(hours("0.1")), Some(6));
        assert_eq!(duration_minutes(hours("2.3")), Some(138));
        assert_eq!(duration_minutes(hours("6")), Some(360));
        assert_eq!(duration_minutes(hours("6.0")), Some(360));
        assert_eq!(duration_minutes(hours("1.50")), Some(90));

        assert_eq!(duration_minutes(hours("1.25")), None);
        assert_eq!(duration_minutes(hours("-1")), None);
    }

    #[test]
    fn test_window_end_follows_duration() {
        let window = TimeWindow::from_duration(at(18, 0), hours("2.3")).unwrap();
        assert_eq!(window.end(), at(20, 18));

        let window = TimeWindow::from_duration(at(18, 0), hours("0.5")).unwrap();
        assert_eq!(window.end(), at(18, 30));

        assert!(TimeWindow::from_duration(at(18, 0), Decimal::ZERO).is_none());
    }

    #[test]
    fn test_overlap_is_closed_on_both_ends() {
        let evening = TimeWindow::new(at(18, 0), at(20, 0)).unwrap();

        let touching_after = TimeWindow::new(at(20, 0), at(21, 0)).unwrap();
        let touching_before = TimeWindow::new(at(17, 0), at(18, 0)).unwrap();
        let inside = TimeWindow::new(at(18, 30), at(19, 0)).unwrap();
        let around = TimeWindow::new(at(17, 0), at(22, 0)).unwrap();
        let later = TimeWindow::new(at(20, 1), at(21, 0)).unwrap();

        assert!(evening.overlaps(&touching_after));
        assert!(evening.overlaps(&touching_before));
        assert!(evening.overlaps(&inside));
        assert!(evening.overlaps(&around));
        assert!(around.overlaps(&evening));
        assert!(!evening.overlaps(&later));
        assert!(!later.overlaps(&evening));
    }

    #[test]
    fn test_timestamp_round_trip() {
        let parsed = parse_timestamp("2030-03-14T19:30:00+02:00").unwrap();
        assert_eq!(parsed, at(17, 30));
        assert_eq!(format_timestamp(&parsed), "2030-03-14T17:30:00+00:00");

        let parsed = parse_timestamp("2030-03-14T17:30:00.987Z").unwrap();
        assert_eq!(format_timestamp(&parsed), "2030-03-14T17:30:00+00:00");
        assert_eq!(parse_timestamp(&format_timestamp(&parsed)).unwrap(), parsed);
    }

    #[test]
    fn test_timestamp_requires_offset() {
        assert!(parse_timestamp("2030-03-14T17:30:00").is_err());
        assert!(parse_timestamp("tomorrow at eight").is_err());
        assert!(parse_timestamp("").is_err());
    }
}
