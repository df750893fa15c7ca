//! Building native values from owned [`Value`]s.
//!
//! Used for prepared-statement parameters. Composite values are built
//! bottom-up: children are created first, copied into the parent by the
//! engine, and then released.

use graphlink_common::types::{TimestampUnit, Value};
use graphlink_common::utils::error::{Error, Result};
use graphlink_native::{
    NativeDate, NativeInt128, NativeInternalId, NativeInterval, NativeTimestamp, RawValue,
};
use tracing::trace;

use crate::bridge::Bridge;
use crate::handle::{NativeHandle, ValueHandle};
use crate::value::{NativeValue, dispatch};

impl Bridge {
    /// Creates a caller-owned native value holding a copy of `value`.
    ///
    /// Arrays are created as lists; graph values (nodes, relationships and
    /// paths) cannot be created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] for graph values, or the engine's error
    /// if a create call fails (for example a list of mixed types).
    pub fn create_value(&self, value: &Value) -> Result<NativeValue<'static>> {
        let handle = self.create_handle(value)?;
        dispatch(handle)
    }

    fn create_handle(&self, value: &Value) -> Result<ValueHandle<'static>> {
        let api = self.api();
        let raw = match value {
            Value::Null => api.value_create_null(),
            Value::Bool(v) => api.value_create_bool(*v),
            Value::Int8(v) => api.value_create_int8(*v),
            Value::Int16(v) => api.value_create_int16(*v),
            Value::Int32(v) => api.value_create_int32(*v),
            Value::Int64(v) => api.value_create_int64(*v),
            Value::UInt8(v) => api.value_create_uint8(*v),
            Value::UInt16(v) => api.value_create_uint16(*v),
            Value::UInt32(v) => api.value_create_uint32(*v),
            Value::UInt64(v) => api.value_create_uint64(*v),
            Value::Int128(v) => api.value_create_int128(NativeInt128::from_i128(*v)),
            Value::Float(v) => api.value_create_float(*v),
            Value::Double(v) => api.value_create_double(*v),
            Value::Date(date) => api.value_create_date(NativeDate { days: date.days() }),
            Value::Timestamp(ts) => {
                let raw = NativeTimestamp { value: ts.value() };
                match ts.unit() {
                    TimestampUnit::Seconds => api.value_create_timestamp_sec(raw),
                    TimestampUnit::Millis => api.value_create_timestamp_ms(raw),
                    TimestampUnit::Micros => api.value_create_timestamp(raw),
                    TimestampUnit::Nanos => api.value_create_timestamp_ns(raw),
                    TimestampUnit::MicrosTz => api.value_create_timestamp_tz(raw),
                }
            }
            Value::Interval(interval) => api.value_create_interval(NativeInterval {
                months: interval.months,
                days: interval.days,
                micros: interval.micros,
            }),
            Value::InternalId(id) => api.value_create_internal_id(NativeInternalId {
                table_id: id.table_id,
                offset: id.offset,
            }),
            Value::String(s) => api.value_create_string(s),
            Value::Blob(bytes) => api.value_create_blob(bytes),
            Value::Uuid(uuid) => {
                let mut out = RawValue::default();
                self.check(
                    api.value_create_uuid(&uuid.to_string(), &mut out),
                    "value_create_uuid",
                )?;
                out
            }
            Value::List(items) | Value::Array(items) => {
                let children = self.create_children(items.iter())?;
                let raws = raw_values(&children)?;
                let mut out = RawValue::default();
                self.check(api.value_create_list(&raws, &mut out), "value_create_list")?;
                out
            }
            Value::Struct(fields) => {
                let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
                let children = self.create_children(fields.iter().map(|(_, v)| v))?;
                let raws = raw_values(&children)?;
                let mut out = RawValue::default();
                self.check(
                    api.value_create_struct(&names, &raws, &mut out),
                    "value_create_struct",
                )?;
                out
            }
            Value::Map(entries) => {
                let keys = self.create_children(entries.iter().map(|(k, _)| k))?;
                let values = self.create_children(entries.iter().map(|(_, v)| v))?;
                let mut out = RawValue::default();
                self.check(
                    api.value_create_map(&raw_values(&keys)?, &raw_values(&values)?, &mut out),
                    "value_create_map",
                )?;
                out
            }
            Value::Node(_) | Value::Rel(_) | Value::RecursiveRel { .. } => {
                return Err(Error::Conversion(format!(
                    "cannot create a native {} value",
                    value.tag()
                )));
            }
        };
        trace!(tag = %value.tag(), ?raw, "created native value");
        Ok(NativeHandle::from_raw(self, raw))
    }

    /// Creates each child; on failure the ones already created are released.
    fn create_children<'v>(
        &self,
        values: impl Iterator<Item = &'v Value>,
    ) -> Result<Vec<ValueHandle<'static>>> {
        values.map(|value| self.create_handle(value)).collect()
    }
}

fn raw_values(handles: &[ValueHandle<'_>]) -> Result<Vec<RawValue>> {
    handles.iter().map(NativeHandle::raw).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphlink_common::types::{Date, InternalId, Interval, NodeSnapshot, Timestamp};
    use graphlink_common::ErrorKind;
    use graphlink_native::MemoryEngine;

    use super::*;

    fn setup() -> (Arc<MemoryEngine>, Bridge) {
        let engine = Arc::new(MemoryEngine::new());
        let bridge = Bridge::new(engine.clone()).unwrap();
        (engine, bridge)
    }

    #[test]
    fn test_scalars_round_trip() {
        let (engine, bridge) = setup();
        let values = [
            Value::Bool(true),
            Value::Int8(-8),
            Value::Int16(-16),
            Value::Int32(-32),
            Value::Int64(-64),
            Value::UInt8(8),
            Value::UInt16(16),
            Value::UInt32(32),
            Value::UInt64(64),
            Value::Int128(-(1 << 100)),
            Value::Float(1.5),
            Value::Double(2.25),
            Value::Date(Date::from_days(19_000)),
            Value::Timestamp(Timestamp::new(1, TimestampUnit::Millis)),
            Value::Interval(Interval::new(1, 2, 3)),
            Value::InternalId(InternalId::new(3, 4)),
            Value::from("text"),
            Value::Blob(vec![1, 2, 3]),
            Value::Uuid(uuid::Uuid::nil()),
        ];
        for value in &values {
            let native = bridge.create_value(value).unwrap();
            assert_eq!(native.tag(), value.tag());
            assert_eq!(&native.to_value().unwrap(), value);
        }
        bridge.flush_releases();
        assert_eq!(engine.live_objects(), 0);
    }

    #[test]
    fn test_nested_composites() {
        let (engine, bridge) = setup();
        let value = Value::Struct(vec![
            ("tags".into(), Value::List(vec![Value::from("a"), Value::from("b")])),
            (
                "scores".into(),
                Value::Map(vec![(Value::from("x"), Value::Double(0.5))]),
            ),
        ]);
        {
            let native = bridge.create_value(&value).unwrap();
            assert_eq!(native.to_value().unwrap(), value);
        }
        bridge.flush_releases();
        let stats = engine.stats();
        assert_eq!(engine.live_objects(), 0);
        assert_eq!(stats.invalid_frees, 0);
        assert_eq!(stats.borrowed_destroys, 0);
    }

    #[test]
    fn test_array_is_created_as_list() {
        let (_engine, bridge) = setup();
        let native = bridge
            .create_value(&Value::Array(vec![Value::Int64(1), Value::Int64(2)]))
            .unwrap();
        assert!(matches!(native, NativeValue::List(_)));
    }

    #[test]
    fn test_null_parameter() {
        let (_engine, bridge) = setup();
        let native = bridge.create_value(&Value::Null).unwrap();
        assert!(native.is_null_variant());
        assert_eq!(native.to_value().unwrap(), Value::Null);
    }

    #[test]
    fn test_graph_values_are_rejected() {
        let (engine, bridge) = setup();
        let node = Value::Node(NodeSnapshot {
            id: InternalId::new(0, 0),
            label: "Person".into(),
            properties: vec![],
        });
        assert_eq!(bridge.create_value(&node).unwrap_err().kind(), ErrorKind::Native);

        let mixed = Value::List(vec![Value::Int64(1), Value::from("x")]);
        let err = bridge.create_value(&mixed).unwrap_err();
        assert!(err.to_string().contains("value_create_list"));

        // the children created before the failure are still released
        bridge.flush_releases();
        assert_eq!(engine.live_objects(), 0);
    }
}
