//! Date, timestamp and interval wrappers.

use std::fmt;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use graphlink_common::types::{Date, Interval, Timestamp, TimestampUnit, TypeTag};
use graphlink_common::utils::error::{Error, Result};
use graphlink_native::{NativeApi, NativeDate, NativeInterval, NativeState, NativeTimestamp, RawValue};

use super::scalar::read_typed;
use super::{ValueExt, value_wrapper};
use crate::handle::ValueHandle;

/// A native DATE. The day count is read when the wrapper is created.
pub struct DateValue<'a> {
    handle: ValueHandle<'a>,
    date: Date,
}

impl<'a> DateValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>) -> Result<Self> {
        let days = read_typed(
            &handle,
            "value_get_date",
            TypeTag::Date,
            |api, raw, out: &mut NativeDate| api.value_get_date(raw, out),
        )?;
        Ok(Self {
            handle,
            date: Date::from_days(days.days),
        })
    }

    /// Returns the date.
    pub fn value(&self) -> Date {
        self.date
    }

    /// Converts to a `chrono` date.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] if the date is outside chrono's range.
    pub fn to_naive_date(&self) -> Result<NaiveDate> {
        self.date
            .to_naive_date()
            .ok_or_else(|| Error::Conversion(format!("date out of range: {} days", self.date.days())))
    }
}

type TimestampGetter = fn(&dyn NativeApi, RawValue, &mut NativeTimestamp) -> NativeState;

/// A native timestamp in one of the five native resolutions.
pub struct TimestampValue<'a> {
    handle: ValueHandle<'a>,
    unit: TimestampUnit,
}

impl<'a> TimestampValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>, tag: TypeTag) -> Self {
        Self {
            handle,
            unit: TimestampUnit::from_tag(tag).unwrap_or(TimestampUnit::Micros),
        }
    }

    /// Returns the resolution.
    pub fn unit(&self) -> TimestampUnit {
        self.unit
    }

    /// Reads the timestamp.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch or native error.
    pub fn value(&self) -> Result<Timestamp> {
        let (operation, get): (&'static str, TimestampGetter) = match self.unit {
            TimestampUnit::Seconds => ("value_get_timestamp_sec", |api, raw, out| {
                api.value_get_timestamp_sec(raw, out)
            }),
            TimestampUnit::Millis => ("value_get_timestamp_ms", |api, raw, out| {
                api.value_get_timestamp_ms(raw, out)
            }),
            TimestampUnit::Micros => ("value_get_timestamp", |api, raw, out| {
                api.value_get_timestamp(raw, out)
            }),
            TimestampUnit::Nanos => ("value_get_timestamp_ns", |api, raw, out| {
                api.value_get_timestamp_ns(raw, out)
            }),
            TimestampUnit::MicrosTz => ("value_get_timestamp_tz", |api, raw, out| {
                api.value_get_timestamp_tz(raw, out)
            }),
        };
        let raw = read_typed(&self.handle, operation, self.unit.tag(), get)?;
        Ok(Timestamp::new(raw.value, self.unit))
    }

    /// Reads the timestamp as a UTC `chrono` time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] if the instant is outside chrono's range.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>> {
        let ts = self.value()?;
        ts.to_datetime()
            .ok_or_else(|| Error::Conversion(format!("timestamp out of range: {ts:?}")))
    }
}

/// A native INTERVAL.
pub struct IntervalValue<'a> {
    handle: ValueHandle<'a>,
}

impl<'a> IntervalValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>) -> Self {
        Self { handle }
    }

    /// Reads the months, days and microseconds.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch or native error.
    pub fn value(&self) -> Result<Interval> {
        let raw = read_typed(
            &self.handle,
            "value_get_interval",
            TypeTag::Interval,
            |api, raw, out: &mut NativeInterval| api.value_get_interval(raw, out),
        )?;
        Ok(Interval::new(raw.months, raw.days, raw.micros))
    }

    /// Reads the interval as a duration of its days and microseconds.
    ///
    /// The month component is dropped; see [`Interval::to_duration`].
    ///
    /// # Errors
    ///
    /// Returns a type mismatch or native error.
    pub fn to_duration(&self) -> Result<TimeDelta> {
        Ok(self.value()?.to_duration())
    }
}

value_wrapper!(DateValue, TimestampValue, IntervalValue);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphlink_common::types::Value;
    use graphlink_native::MemoryEngine;

    use super::*;
    use crate::bridge::Bridge;
    use crate::value::NativeValue;

    fn bridge() -> Bridge {
        Bridge::new(Arc::new(MemoryEngine::new())).unwrap()
    }

    #[test]
    fn test_date_is_read_eagerly() {
        let bridge = bridge();
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let value = bridge
            .create_value(&Value::Date(Date::from_naive_date(date).unwrap()))
            .unwrap();
        let NativeValue::Date(wrapper) = value else {
            panic!("expected a date");
        };
        assert_eq!(wrapper.to_naive_date().unwrap(), date);
    }

    #[test]
    fn test_timestamp_units() {
        let bridge = bridge();
        let cases = [
            (TimestampUnit::Seconds, 1_700_000_000, TypeTag::TimestampSec),
            (TimestampUnit::Millis, 1_700_000_000_123, TypeTag::TimestampMs),
            (TimestampUnit::Micros, 1_700_000_000_123_456, TypeTag::Timestamp),
            (TimestampUnit::Nanos, 1_700_000_000_123_456_789, TypeTag::TimestampNs),
            (TimestampUnit::MicrosTz, -1, TypeTag::TimestampTz),
        ];
        for (unit, raw, tag) in cases {
            let ts = Timestamp::new(raw, unit);
            let value = bridge.create_value(&Value::Timestamp(ts)).unwrap();
            assert_eq!(value.tag(), tag);
            assert_eq!(value.to_value().unwrap(), Value::Timestamp(ts));
        }

        let ns = bridge
            .create_value(&Value::Timestamp(Timestamp::new(1_500, TimestampUnit::Nanos)))
            .unwrap();
        let NativeValue::TimestampNs(wrapper) = ns else {
            panic!("expected TIMESTAMP_NS");
        };
        let datetime = wrapper.to_datetime().unwrap();
        assert_eq!(datetime.timestamp(), 0);
        assert_eq!(datetime.timestamp_subsec_nanos(), 1_500);
    }

    #[test]
    fn test_interval_drops_months() {
        let bridge = bridge();
        let value = bridge
            .create_value(&Value::Interval(Interval::new(2, 3, 4_000_000)))
            .unwrap();
        let NativeValue::Interval(wrapper) = value else {
            panic!("expected an interval");
        };
        assert_eq!(wrapper.value().unwrap().months, 2);
        assert_eq!(
            wrapper.to_duration().unwrap(),
            TimeDelta::days(3) + TimeDelta::seconds(4)
        );
    }
}
