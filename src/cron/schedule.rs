use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, TimeZone};

use crate::cron::expr::CronExpression;
use crate::error::ScheduleError;

/// When a task fires.
///
/// - `Cron`: wall-clock recurrence
/// - `FixedDelay`: first fire one delay after submission, then one delay
///   after each completed fire
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Schedule {
    Cron(CronExpression),
    FixedDelay(Duration),
}

impl Schedule {
    /// Parses cron syntax first, then a plain integer as milliseconds.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use bootvisor::cron::Schedule;
    ///
    /// assert!(matches!(Schedule::parse("0 */5 * * * *"), Ok(Schedule::Cron(_))));
    /// assert_eq!(Schedule::parse("1500").unwrap(), Schedule::FixedDelay(Duration::from_millis(1500)));
    /// assert!(Schedule::parse("every day").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, ScheduleError> {
        let trimmed = input.trim();
        match CronExpression::parse(trimmed) {
            Ok(expr) => Ok(Schedule::Cron(expr)),
            Err(cron_err) => match trimmed.parse::<u64>() {
                Ok(0) => Err(ScheduleError::parse(input, "fixed delay must be positive")),
                Ok(ms) => Ok(Schedule::FixedDelay(Duration::from_millis(ms))),
                Err(_) => Err(cron_err),
            },
        }
    }

    /// Resolves the schedule attributes of a task definition.
    ///
    /// A non-blank `cron` wins; otherwise `delay_ms` is used.
    pub fn resolve(cron: Option<&str>, delay_ms: Option<u64>) -> Result<Self, ScheduleError> {
        match (cron.filter(|c| !c.trim().is_empty()), delay_ms) {
            (Some(cron), _) => Self::parse(cron),
            (None, Some(0)) => Err(ScheduleError::parse("0", "fixed delay must be positive")),
            (None, Some(ms)) => Ok(Schedule::FixedDelay(Duration::from_millis(ms))),
            (None, None) => Err(ScheduleError::parse("", "neither cron nor delay given")),
        }
    }

    /// Next fire instant strictly after `after`.
    pub fn next_fire<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        match self {
            Schedule::Cron(expr) => expr.next_after(after),
            Schedule::FixedDelay(delay) if delay.is_zero() => None,
            Schedule::FixedDelay(delay) => {
                let delta = TimeDelta::from_std(*delay).ok()?;
                after.clone().checked_add_signed(delta)
            }
        }
    }

    /// How long to sleep from now until the next fire.
    pub fn delay_from_now(&self) -> Option<Duration> {
        match self {
            Schedule::FixedDelay(delay) if delay.is_zero() => None,
            Schedule::FixedDelay(delay) => Some(*delay),
            Schedule::Cron(expr) => {
                let now = Local::now();
                let next = expr.next_after(&now)?;
                (next - now).to_std().ok()
            }
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Cron(expr) => write!(f, "cron({expr})"),
            Schedule::FixedDelay(d) => write!(f, "fixed-delay({}ms)", d.as_millis()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    #[test]
    fn cron_wins_over_delay() {
        let s = Schedule::resolve(Some("0 0 * * * *"), Some(10)).unwrap();
        assert!(matches!(s, Schedule::Cron(_)));

        let s = Schedule::resolve(Some("  "), Some(10)).unwrap();
        assert_eq!(s, Schedule::FixedDelay(Duration::from_millis(10)));
    }

    #[test]
    fn rejects_zero_and_missing() {
        assert!(Schedule::parse("0").is_err());
        assert!(Schedule::resolve(None, Some(0)).is_err());
        assert!(Schedule::resolve(None, None).is_err());
    }

    #[test]
    fn oversized_step_is_a_parse_error() {
        let err = Schedule::parse("1/4294967295 * * * * *").unwrap_err();
        assert!(err.as_message().contains("exceeds the field span"), "{err}");
    }

    #[test]
    fn parse_error_reports_cron_reason() {
        let err = Schedule::parse("* * * * * * * *").unwrap_err();
        assert!(err.as_message().contains("expected 5 or 6 fields"));
    }

    #[test]
    fn fixed_delay_adds_to_reference() {
        let s = Schedule::parse("250").unwrap();
        let t = Utc::now();
        assert_eq!(s.next_fire(&t), Some(t + TimeDelta::milliseconds(250)));
        assert_eq!(s.delay_from_now(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn cron_delay_is_bounded_by_period() {
        let s = Schedule::parse("* * * * * *").unwrap();
        let d = s.delay_from_now().unwrap();
        assert!(d <= Duration::from_secs(1));
    }

    const SAMPLES: &[&str] = &[
        "* * * * * *",
        "*/7 * * * * *",
        "0 */5 * * * ?",
        "30 15 10 * * MON-FRI",
        "0 0 0 1 JAN,JUL ?",
        "0 0 29 2 *",
        "0 12 13 * FRI",
        "1000",
        "86400000",
    ];

    proptest! {
        #[test]
        fn next_fire_never_in_the_past(idx in 0..SAMPLES.len(), secs in 0i64..4_102_444_800, nanos in 0u32..1_000_000_000) {
            let schedule = Schedule::parse(SAMPLES[idx]).unwrap();
            let t = Utc.timestamp_opt(secs, nanos).unwrap();
            if let Some(next) = schedule.next_fire(&t) {
                prop_assert!(next > t);
            }
        }
    }
}
