//! Temporal types: dates, timestamps and intervals.
//!
//! All conversions to `chrono` types use integer arithmetic only, so no
//! precision is lost to floating point on the way.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TypeTag;

const MICROS_PER_DAY: i64 = 86_400_000_000;

fn epoch_date() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

/// A calendar date stored as days since 1970-01-01 (UTC). No time component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Date {
    days: i32,
}

impl Date {
    /// Creates a date from days since the epoch.
    #[inline]
    #[must_use]
    pub const fn from_days(days: i32) -> Self {
        Self { days }
    }

    /// Returns the number of days since the epoch.
    #[inline]
    #[must_use]
    pub const fn days(self) -> i32 {
        self.days
    }

    /// Converts to a `chrono` date.
    #[must_use]
    pub fn to_naive_date(self) -> Option<NaiveDate> {
        epoch_date().checked_add_signed(TimeDelta::days(i64::from(self.days)))
    }

    /// Converts from a `chrono` date, or `None` if it is out of range.
    #[must_use]
    pub fn from_naive_date(date: NaiveDate) -> Option<Self> {
        let days = date.signed_duration_since(epoch_date()).num_days();
        i32::try_from(days).ok().map(Self::from_days)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_naive_date() {
            Some(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            None => write!(f, "date({})", self.days),
        }
    }
}

/// The native resolution of a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimestampUnit {
    /// Seconds since the epoch.
    Seconds,
    /// Milliseconds since the epoch.
    Millis,
    /// Microseconds since the epoch.
    Micros,
    /// Nanoseconds since the epoch.
    Nanos,
    /// Microseconds since the epoch, with an implied UTC offset.
    MicrosTz,
}

impl TimestampUnit {
    /// Returns how many units make up one second.
    #[must_use]
    pub const fn per_second(self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Millis => 1_000,
            Self::Micros | Self::MicrosTz => 1_000_000,
            Self::Nanos => 1_000_000_000,
        }
    }

    /// Returns the native tag that carries this unit.
    #[must_use]
    pub const fn tag(self) -> TypeTag {
        match self {
            Self::Seconds => TypeTag::TimestampSec,
            Self::Millis => TypeTag::TimestampMs,
            Self::Micros => TypeTag::Timestamp,
            Self::Nanos => TypeTag::TimestampNs,
            Self::MicrosTz => TypeTag::TimestampTz,
        }
    }

    /// Returns the unit carried by a timestamp tag.
    #[must_use]
    pub const fn from_tag(tag: TypeTag) -> Option<Self> {
        match tag {
            TypeTag::TimestampSec => Some(Self::Seconds),
            TypeTag::TimestampMs => Some(Self::Millis),
            TypeTag::Timestamp => Some(Self::Micros),
            TypeTag::TimestampNs => Some(Self::Nanos),
            TypeTag::TimestampTz => Some(Self::MicrosTz),
            _ => None,
        }
    }
}

/// A point in time in one of the native resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    value: i64,
    unit: TimestampUnit,
}

impl Timestamp {
    /// Creates a timestamp from a raw count of `unit`s since the epoch.
    #[inline]
    #[must_use]
    pub const fn new(value: i64, unit: TimestampUnit) -> Self {
        Self { value, unit }
    }

    /// Returns the raw count of units since the epoch.
    #[inline]
    #[must_use]
    pub const fn value(self) -> i64 {
        self.value
    }

    /// Returns the resolution.
    #[inline]
    #[must_use]
    pub const fn unit(self) -> TimestampUnit {
        self.unit
    }

    /// Converts to a UTC `chrono` timestamp without losing sub-unit precision.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let per_second = self.unit.per_second();
        let secs = self.value.div_euclid(per_second);
        let rem = self.value.rem_euclid(per_second);
        // rem < per_second <= 1e9, so the product stays below 1e9
        let nanos = rem * (1_000_000_000 / per_second);
        DateTime::<Utc>::from_timestamp(secs, u32::try_from(nanos).ok()?)
    }

    /// Converts from a `chrono` timestamp, truncating below the target unit.
    #[must_use]
    pub fn from_datetime(datetime: DateTime<Utc>, unit: TimestampUnit) -> Option<Self> {
        let value = match unit {
            TimestampUnit::Seconds => datetime.timestamp(),
            TimestampUnit::Millis => datetime.timestamp_millis(),
            TimestampUnit::Micros | TimestampUnit::MicrosTz => datetime.timestamp_micros(),
            TimestampUnit::Nanos => datetime.timestamp_nanos_opt()?,
        };
        Some(Self::new(value, unit))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(datetime) => write!(f, "{}", datetime.to_rfc3339()),
            None => write!(f, "timestamp({} {:?})", self.value, self.unit),
        }
    }
}

/// A calendar interval of months, days and microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Interval {
    /// Whole months.
    pub months: i32,
    /// Whole days.
    pub days: i32,
    /// Microseconds.
    pub micros: i64,
}

impl Interval {
    /// Creates a new interval.
    #[must_use]
    pub const fn new(months: i32, days: i32, micros: i64) -> Self {
        Self {
            months,
            days,
            micros,
        }
    }

    /// Converts to an exact duration of `days` plus `micros`.
    ///
    /// The month component is **not** expanded: a month has no fixed length
    /// outside a calendar, and the conversion treats it as zero. Callers doing
    /// calendar math should read [`Interval::months`] separately.
    #[must_use]
    pub fn to_duration(self) -> TimeDelta {
        TimeDelta::days(i64::from(self.days)) + TimeDelta::microseconds(self.micros)
    }

    /// Splits a duration into whole days and the remaining microseconds.
    ///
    /// Returns `None` when the day count does not fit the native field.
    #[must_use]
    pub fn from_duration(duration: TimeDelta) -> Option<Self> {
        let days = duration.num_days();
        let rem = duration - TimeDelta::days(days);
        let micros = rem.num_microseconds()?;
        debug_assert!(micros.abs() < MICROS_PER_DAY);
        Some(Self::new(0, i32::try_from(days).ok()?, micros))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} months {} days {} us",
            self.months, self.days, self.micros
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_date_epoch() {
        let date = Date::from_days(0);
        assert_eq!(date.to_naive_date(), NaiveDate::from_ymd_opt(1970, 1, 1));
        assert_eq!(date.to_string(), "1970-01-01");

        let before = Date::from_days(-1);
        assert_eq!(before.to_naive_date(), NaiveDate::from_ymd_opt(1969, 12, 31));
    }

    #[test]
    fn test_timestamp_units() {
        let expected = DateTime::<Utc>::from_timestamp(1_700_000_000, 123_000_000).unwrap();

        let ms = Timestamp::new(1_700_000_000_123, TimestampUnit::Millis);
        assert_eq!(ms.to_datetime(), Some(expected));

        let us = Timestamp::new(1_700_000_000_123_000, TimestampUnit::Micros);
        assert_eq!(us.to_datetime(), Some(expected));

        let ns = Timestamp::new(1_700_000_000_123_000_000, TimestampUnit::Nanos);
        assert_eq!(ns.to_datetime(), Some(expected));
    }

    #[test]
    fn test_timestamp_before_epoch() {
        // -1 ns is 1969-12-31T23:59:59.999999999
        let ts = Timestamp::new(-1, TimestampUnit::Nanos);
        let dt = ts.to_datetime().unwrap();
        assert_eq!(dt.timestamp(), -1);
        assert_eq!(dt.timestamp_subsec_nanos(), 999_999_999);
    }

    #[test]
    fn test_interval_ignores_months() {
        let interval = Interval::new(14, 2, 1_500_000);
        let duration = interval.to_duration();
        assert_eq!(duration.num_days(), 2);
        assert_eq!(
            duration.num_microseconds(),
            Some(2 * MICROS_PER_DAY + 1_500_000)
        );
    }

    #[test]
    fn test_interval_from_duration() {
        let duration = TimeDelta::days(3) + TimeDelta::microseconds(42);
        assert_eq!(Interval::from_duration(duration), Some(Interval::new(0, 3, 42)));
    }

    #[test]
    fn test_unit_tags() {
        for unit in [
            TimestampUnit::Seconds,
            TimestampUnit::Millis,
            TimestampUnit::Micros,
            TimestampUnit::Nanos,
            TimestampUnit::MicrosTz,
        ] {
            assert_eq!(TimestampUnit::from_tag(unit.tag()), Some(unit));
        }
        assert_eq!(TimestampUnit::from_tag(TypeTag::Date), None);
    }

    proptest! {
        #[test]
        fn prop_micros_timestamp_is_exact(value in -10_000_000_000_000_000i64..10_000_000_000_000_000i64) {
            let ts = Timestamp::new(value, TimestampUnit::Micros);
            let dt = ts.to_datetime().unwrap();
            prop_assert_eq!(dt.timestamp_micros(), value);
        }

        #[test]
        fn prop_date_roundtrip(days in -700_000i32..700_000i32) {
            let date = Date::from_days(days);
            let naive = date.to_naive_date().unwrap();
            prop_assert_eq!(Date::from_naive_date(naive), Some(date));
        }

        #[test]
        fn prop_interval_duration_exact(days in -100_000i32..100_000i32, micros in -MICROS_PER_DAY..MICROS_PER_DAY) {
            let duration = Interval::new(0, days, micros).to_duration();
            prop_assert_eq!(
                duration.num_microseconds(),
                Some(i64::from(days) * MICROS_PER_DAY + micros)
            );
        }
    }
}
