//! Single cron field parsing into a bit set of allowed values.

/// Which position a field occupies; decides bounds and accepted names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Second,
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

impl FieldKind {
    fn bounds(self) -> (u32, u32) {
        match self {
            FieldKind::Second | FieldKind::Minute => (0, 59),
            FieldKind::Hour => (0, 23),
            FieldKind::DayOfMonth => (1, 31),
            FieldKind::Month => (1, 12),
            // 7 is accepted as Sunday and folded into 0.
            FieldKind::DayOfWeek => (0, 7),
        }
    }

    fn label(self) -> &'static str {
        match self {
            FieldKind::Second => "second",
            FieldKind::Minute => "minute",
            FieldKind::Hour => "hour",
            FieldKind::DayOfMonth => "day-of-month",
            FieldKind::Month => "month",
            FieldKind::DayOfWeek => "day-of-week",
        }
    }

    fn allows_question_mark(self) -> bool {
        matches!(self, FieldKind::DayOfMonth | FieldKind::DayOfWeek)
    }

    fn value(self, token: &str) -> Result<u32, String> {
        if let Ok(v) = token.parse::<u32>() {
            return Ok(v);
        }
        let upper = token.to_ascii_uppercase();
        let named = match self {
            FieldKind::Month => MONTHS.iter().position(|m| *m == upper).map(|i| i as u32 + 1),
            FieldKind::DayOfWeek => WEEKDAYS.iter().position(|d| *d == upper).map(|i| i as u32),
            _ => None,
        };
        named.ok_or_else(|| format!("{} value {token:?} is not a number", self.label()))
    }
}

/// Allowed values of one field, plus whether the field was written as `*`/`?`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FieldSet {
    bits: u64,
    unrestricted: bool,
}

impl FieldSet {
    pub(crate) fn parse(text: &str, kind: FieldKind) -> Result<Self, String> {
        let (min, max) = kind.bounds();
        let mut bits = 0u64;

        for part in text.split(',') {
            if part.is_empty() {
                return Err(format!("empty list item in {} field", kind.label()));
            }
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => {
                    let step: u32 = step
                        .parse()
                        .map_err(|_| format!("{} step {step:?} is not a number", kind.label()))?;
                    if step == 0 {
                        return Err(format!("{} step must be positive", kind.label()));
                    }
                    if step > max - min {
                        return Err(format!(
                            "{} step {step} exceeds the field span {min}-{max}",
                            kind.label()
                        ));
                    }
                    (range, Some(step))
                }
                None => (part, None),
            };

            let (lo, hi) = if range == "*" || (range == "?" && kind.allows_question_mark()) {
                (min, max)
            } else if let Some((a, b)) = range.split_once('-') {
                (kind.value(a)?, kind.value(b)?)
            } else {
                let v = kind.value(range)?;
                // `A/N` means "from A to the end of the range every N".
                if step.is_some() { (v, max) } else { (v, v) }
            };

            if lo < min || hi > max || lo > hi {
                return Err(format!(
                    "{} range {lo}-{hi} outside {min}-{max}",
                    kind.label()
                ));
            }

            let step = step.unwrap_or(1);
            let mut v = lo;
            while v <= hi {
                bits |= 1 << v;
                match v.checked_add(step) {
                    Some(next) => v = next,
                    None => break,
                }
            }
        }

        if kind == FieldKind::DayOfWeek && bits & (1 << 7) != 0 {
            bits = (bits & !(1 << 7)) | 1;
        }

        Ok(Self {
            bits,
            unrestricted: text.starts_with('*') || text == "?",
        })
    }

    #[inline]
    pub(crate) fn contains(&self, v: u32) -> bool {
        v < 64 && self.bits & (1 << v) != 0
    }

    /// Smallest allowed value `>= from`, if any.
    pub(crate) fn next_from(&self, from: u32) -> Option<u32> {
        if from >= 64 {
            return None;
        }
        let masked = self.bits & (u64::MAX << from);
        (masked != 0).then(|| masked.trailing_zeros())
    }

    pub(crate) fn first(&self) -> Option<u32> {
        self.next_from(0)
    }

    /// `true` when written as `*...` or `?`.
    pub(crate) fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(set: FieldSet) -> Vec<u32> {
        (0..64).filter(|v| set.contains(*v)).collect()
    }

    #[test]
    fn lists_ranges_and_steps() {
        let set = FieldSet::parse("1,5-7,*/20", FieldKind::Minute).unwrap();
        assert_eq!(values(set), vec![0, 1, 5, 6, 7, 20, 40]);

        let set = FieldSet::parse("10/15", FieldKind::Second).unwrap();
        assert_eq!(values(set), vec![10, 25, 40, 55]);

        let set = FieldSet::parse("0-10/5", FieldKind::Hour).unwrap();
        assert_eq!(values(set), vec![0, 5, 10]);
    }

    #[test]
    fn names_are_case_insensitive() {
        let set = FieldSet::parse("jan,Mar-MAY", FieldKind::Month).unwrap();
        assert_eq!(values(set), vec![1, 3, 4, 5]);

        let set = FieldSet::parse("MON-FRI", FieldKind::DayOfWeek).unwrap();
        assert_eq!(values(set), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn seven_is_sunday() {
        let set = FieldSet::parse("5-7", FieldKind::DayOfWeek).unwrap();
        assert_eq!(values(set), vec![0, 5, 6]);
    }

    #[test]
    fn question_mark_only_in_day_fields() {
        assert!(FieldSet::parse("?", FieldKind::DayOfMonth).unwrap().is_unrestricted());
        assert!(FieldSet::parse("?", FieldKind::Hour).is_err());
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert!(FieldSet::parse("60", FieldKind::Second).is_err());
        assert!(FieldSet::parse("0", FieldKind::DayOfMonth).is_err());
        assert!(FieldSet::parse("5-1", FieldKind::Hour).is_err());
        assert!(FieldSet::parse("*/0", FieldKind::Minute).is_err());
        assert!(FieldSet::parse("1,,2", FieldKind::Minute).is_err());
        assert!(FieldSet::parse("abc", FieldKind::Minute).is_err());
    }

    #[test]
    fn rejects_steps_wider_than_the_field() {
        assert!(FieldSet::parse("*/90", FieldKind::Second).is_err());
        assert!(FieldSet::parse("*/60", FieldKind::Minute).is_err());
        assert!(FieldSet::parse("1/4294967295", FieldKind::Second).is_err());
        assert!(FieldSet::parse("0-23/24", FieldKind::Hour).is_err());

        let set = FieldSet::parse("*/59", FieldKind::Second).unwrap();
        assert_eq!(values(set), vec![0, 59]);
    }

    #[test]
    fn next_from_walks_the_bits() {
        let set = FieldSet::parse("5,30", FieldKind::Minute).unwrap();
        assert_eq!(set.first(), Some(5));
        assert_eq!(set.next_from(6), Some(30));
        assert_eq!(set.next_from(31), None);
        assert_eq!(set.next_from(64), None);
    }
}
