//! # Cron expressions.
//!
//! Five fields (`minute hour day-of-month month day-of-week`, seconds fixed
//! at `0`) or six fields (seconds first).
//!
//! ## Rules
//! - Day-of-month and day-of-week are OR-ed when both are restricted and
//!   AND-ed when either is written as `*`/`?`.
//! - [`CronExpression::next_after`] is strictly greater than its reference
//!   and searches at most [`SEARCH_HORIZON_YEARS`] ahead.
//! - Local times that do not exist (DST gaps) are skipped; ambiguous ones
//!   resolve to the earliest instant.

use std::fmt;

use chrono::{
    DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Timelike,
};

use crate::cron::field::{FieldKind, FieldSet};
use crate::error::ScheduleError;

/// How far ahead `next_after` searches before giving up.
pub const SEARCH_HORIZON_YEARS: i32 = 8;

/// A parsed cron expression.
#[derive(Clone, PartialEq, Eq)]
pub struct CronExpression {
    source: String,
    seconds: FieldSet,
    minutes: FieldSet,
    hours: FieldSet,
    days_of_month: FieldSet,
    months: FieldSet,
    days_of_week: FieldSet,
}

impl CronExpression {
    /// Parses a five- or six-field expression.
    ///
    /// # Example
    /// ```
    /// use bootvisor::cron::CronExpression;
    ///
    /// assert!(CronExpression::parse("*/5 * * * * ?").is_ok());
    /// assert!(CronExpression::parse("0 9 * * MON-FRI").is_ok());
    /// assert!(CronExpression::parse("1000").is_err());
    /// ```
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let (sec, rest) = match fields.len() {
            5 => ("0", &fields[..]),
            6 => (fields[0], &fields[1..]),
            n => {
                return Err(ScheduleError::parse(
                    expr,
                    format!("expected 5 or 6 fields, found {n}"),
                ));
            }
        };
        let field = |text: &str, kind| FieldSet::parse(text, kind).map_err(|reason| ScheduleError::parse(expr, reason));

        Ok(Self {
            source: fields.join(" "),
            seconds: field(sec, FieldKind::Second)?,
            minutes: field(rest[0], FieldKind::Minute)?,
            hours: field(rest[1], FieldKind::Hour)?,
            days_of_month: field(rest[2], FieldKind::DayOfMonth)?,
            months: field(rest[3], FieldKind::Month)?,
            days_of_week: field(rest[4], FieldKind::DayOfWeek)?,
        })
    }

    /// Normalised source text (single spaces).
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the instant (at second precision) matches every field.
    pub fn matches<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        let t = at.naive_local();
        self.months.contains(t.month())
            && self.day_matches(t.date())
            && self.hours.contains(t.hour())
            && self.minutes.contains(t.minute())
            && self.seconds.contains(t.second())
    }

    /// First matching instant strictly after `after`.
    ///
    /// Returns `None` when nothing matches within the search horizon
    /// (for example `0 0 30 2 *`).
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = after.timezone();
        let start = after.naive_local().with_nanosecond(0)? + TimeDelta::seconds(1);
        let limit = start.year() + SEARCH_HORIZON_YEARS;

        let mut from = start;
        loop {
            let naive = self.next_naive(from, limit)?;
            match tz.from_local_datetime(&naive).earliest() {
                Some(t) if t > *after => return Some(t),
                _ => from = naive + TimeDelta::seconds(1),
            }
        }
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        let dom = self.days_of_month.contains(date.day());
        let dow = self.days_of_week.contains(date.weekday().num_days_from_sunday());
        if self.days_of_month.is_unrestricted() || self.days_of_week.is_unrestricted() {
            dom && dow
        } else {
            dom || dow
        }
    }

    fn next_naive(&self, mut t: NaiveDateTime, limit_year: i32) -> Option<NaiveDateTime> {
        loop {
            if t.year() > limit_year {
                return None;
            }
            if !self.months.contains(t.month()) {
                t = match self.months.next_from(t.month() + 1) {
                    Some(m) => month_start(t.year(), m)?,
                    None => month_start(t.year() + 1, self.months.first()?)?,
                };
                continue;
            }
            if !self.day_matches(t.date()) {
                t = t.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !self.hours.contains(t.hour()) {
                t = match self.hours.next_from(t.hour() + 1) {
                    Some(h) => t.date().and_hms_opt(h, 0, 0)?,
                    None => t.date().succ_opt()?.and_hms_opt(0, 0, 0)?,
                };
                continue;
            }
            if !self.minutes.contains(t.minute()) {
                t = match self.minutes.next_from(t.minute() + 1) {
                    Some(m) => t.date().and_hms_opt(t.hour(), m, 0)?,
                    None => t.date().and_hms_opt(t.hour(), 0, 0)? + TimeDelta::hours(1),
                };
                continue;
            }
            if !self.seconds.contains(t.second()) {
                t = match self.seconds.next_from(t.second() + 1) {
                    Some(s) => t.date().and_hms_opt(t.hour(), t.minute(), s)?,
                    None => t.date().and_hms_opt(t.hour(), t.minute(), 0)? + TimeDelta::minutes(1),
                };
                continue;
            }
            return Some(t);
        }
    }
}

fn month_start(year: i32, month: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl fmt::Debug for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronExpression").field(&self.source).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn next(expr: &str, from: &str) -> Option<String> {
        CronExpression::parse(expr)
            .unwrap()
            .next_after(&utc(from))
            .map(|t| t.to_rfc3339())
    }

    #[test]
    fn every_second_ticks_forward() {
        assert_eq!(
            next("* * * * * *", "2024-01-01T00:00:00.500Z").as_deref(),
            Some("2024-01-01T00:00:01+00:00")
        );
    }

    #[test]
    fn five_fields_fire_on_the_minute() {
        assert_eq!(
            next("*/15 * * * *", "2024-01-01T10:07:30Z").as_deref(),
            Some("2024-01-01T10:15:00+00:00")
        );
    }

    #[test]
    fn rolls_over_hours_days_and_years() {
        assert_eq!(
            next("0 30 9 * * *", "2024-01-01T09:30:00Z").as_deref(),
            Some("2024-01-02T09:30:00+00:00")
        );
        assert_eq!(
            next("0 0 0 1 JAN ?", "2024-06-15T12:00:00Z").as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn weekdays_and_leap_days() {
        // 2024-01-06 is a Saturday.
        assert_eq!(
            next("0 9 * * MON-FRI", "2024-01-06T00:00:00Z").as_deref(),
            Some("2024-01-08T09:00:00+00:00")
        );
        assert_eq!(
            next("0 0 29 2 *", "2024-03-01T00:00:00Z").as_deref(),
            Some("2028-02-29T00:00:00+00:00")
        );
    }

    #[test]
    fn restricted_day_fields_are_ored() {
        // Either the 13th or any Friday; 2024-09-06 is a Friday.
        assert_eq!(
            next("0 0 13 * FRI", "2024-09-01T00:00:00Z").as_deref(),
            Some("2024-09-06T00:00:00+00:00")
        );
    }

    #[test]
    fn impossible_date_has_no_fire() {
        assert_eq!(next("0 0 30 2 *", "2024-01-01T00:00:00Z"), None);
    }

    #[test]
    fn matches_checks_every_field() {
        let expr = CronExpression::parse("0 0 12 * * MON").unwrap();
        assert!(expr.matches(&utc("2024-01-08T12:00:00Z")));
        assert!(!expr.matches(&utc("2024-01-09T12:00:00Z")));
        assert!(!expr.matches(&utc("2024-01-08T12:00:01Z")));
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = CronExpression::parse("* * *").unwrap_err();
        assert_eq!(err.as_label(), "schedule_parse");
    }

    #[test]
    fn source_is_normalised() {
        let expr = CronExpression::parse("  0   0  * * * ").unwrap();
        assert_eq!(expr.as_str(), "0 0 * * *");
    }
}
