//! An instrumented, in-process implementation of [`NativeApi`].
//!
//! [`MemoryEngine`] keeps every native object on a private heap keyed by
//! address and follows the same ownership rules a linked engine does:
//!
//! - children of composite values are pre-allocated, handed out as
//!   engine-owned views and freed together with their parent;
//! - every result owns one row buffer, overwritten in place by each
//!   `get_next`, while each `get_next` also allocates a row descriptor the
//!   caller must free;
//! - strings and logical types come back as caller-owned allocations.
//!
//! On top of that it counts what callers do wrong: frees of unknown or
//! engine-owned addresses, destroy calls that overlap in time, and reads of
//! freed addresses. See [`StatsSnapshot`].

mod object;
mod render;
mod result;
mod stats;

pub use result::ResultSet;
pub use stats::{CallStats, StatsSnapshot};

use std::cell::RefCell;

use graphlink_common::types::{
    Date, InternalId, Interval, LogicalType, Timestamp, TimestampUnit, TypeTag, Value,
};
use parking_lot::Mutex;
use tracing::{trace, warn};
use uuid::Uuid;

use crate::api::NativeApi;
use crate::raw::{
    NativeDate, NativeInt128, NativeInternalId, NativeInterval, NativeQuerySummary, NativeState,
    NativeTimestamp, RawFlatTuple, RawLogicalType, RawPtr, RawQueryResult, RawString, RawValue,
};
use object::{Children, Object, Payload, Slab, ValueObject, type_for, type_of};
use render::{render, render_row, render_table};
use result::ResultObject;
use stats::DestroyKind;

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Records `message` as this thread's last error.
fn fail(message: impl Into<String>) -> NativeState {
    let message = message.into();
    LAST_ERROR.with(|cell| *cell.borrow_mut() = Some(message));
    NativeState::Error
}

fn write_out<T>(out: &mut T, read: Result<T, NativeState>) -> NativeState {
    match read {
        Ok(value) => {
            *out = value;
            NativeState::Success
        }
        Err(state) => state,
    }
}

fn expect_tag(obj: &ValueObject, expected: &[TypeTag]) -> Result<(), String> {
    match obj.ty.tag() {
        Some(tag) if expected.contains(&tag) => {
            if obj.is_null {
                Err(format!("{tag} value is null"))
            } else {
                Ok(())
            }
        }
        _ => Err(format!("expected {} value, found {}", expected[0], obj.ty)),
    }
}

fn at<T: Clone>(items: &[T], index: u64, what: &str) -> Result<T, String> {
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .cloned()
        .ok_or_else(|| format!("{what} index {index} out of range (size {})", items.len()))
}

fn ptr(addr: usize) -> RawPtr {
    RawPtr::from_addr(addr)
}

/// An in-process native engine.
///
/// # Examples
///
/// ```
/// use graphlink_common::types::Value;
/// use graphlink_native::{MemoryEngine, NativeApi, NativeState};
///
/// let engine = MemoryEngine::new();
/// let value = engine.load_value(&Value::Int64(42));
///
/// let mut out = 0i64;
/// assert_eq!(engine.value_get_int64(value, &mut out), NativeState::Success);
/// assert_eq!(out, 42);
///
/// engine.value_destroy(value);
/// assert_eq!(engine.live_objects(), 0);
/// ```
pub struct MemoryEngine {
    slab: Mutex<Slab>,
    stats: CallStats,
}

impl MemoryEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slab: Mutex::new(Slab::new()),
            stats: CallStats::default(),
        }
    }

    /// Opens a finished query. The result is caller-owned.
    pub fn open_result(&self, set: ResultSet) -> RawQueryResult {
        let addr = self
            .slab
            .lock()
            .insert(Object::QueryResult(ResultObject::new(set)));
        trace!(addr = format_args!("{addr:#x}"), "opened query result");
        RawQueryResult {
            ptr: ptr(addr),
            owned_by_engine: false,
        }
    }

    /// Allocates a caller-owned native copy of `value`.
    pub fn load_value(&self, value: &Value) -> RawValue {
        let addr = self.slab.lock().alloc_value(value, type_of(value), None);
        RawValue::owned(ptr(addr))
    }

    /// Allocates a caller-owned native copy of `value` with a declared type.
    ///
    /// Only a null `value` keeps `ty` verbatim; anything else reports its own type.
    pub fn load_typed_value(&self, value: &Value, ty: &LogicalType) -> RawValue {
        let addr = self
            .slab
            .lock()
            .alloc_value(value, type_for(value, ty), None);
        RawValue::owned(ptr(addr))
    }

    /// Reads a native value back into an owned tree, without counting as a call.
    pub fn peek_value(&self, value: RawValue) -> Option<Value> {
        self.slab.lock().snapshot(value.ptr.addr())
    }

    /// Returns the call counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns the number of objects currently allocated, children included.
    pub fn live_objects(&self) -> usize {
        self.slab.lock().len()
    }

    fn read<T>(
        &self,
        value: RawValue,
        f: impl FnOnce(&Slab, &ValueObject) -> Result<T, String>,
    ) -> Result<T, NativeState> {
        let slab = self.slab.lock();
        let Some(obj) = slab.value(value.ptr.addr()) else {
            self.stats.dangling_access();
            return Err(fail(format!("invalid value pointer {:?}", value.ptr)));
        };
        f(&slab, obj).map_err(fail)
    }

    fn read_scalar<T>(
        &self,
        value: RawValue,
        expected: TypeTag,
        extract: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<T, NativeState> {
        self.read(value, |_, obj| {
            expect_tag(obj, &[expected])?;
            match &obj.payload {
                Payload::Scalar(scalar) => extract(scalar),
                _ => None,
            }
            .ok_or_else(|| format!("corrupt {expected} value"))
        })
    }

    fn read_child(
        &self,
        value: RawValue,
        expected: &[TypeTag],
        pick: impl FnOnce(&Payload) -> Result<usize, String>,
    ) -> Result<RawValue, NativeState> {
        self.read(value, |_, obj| {
            expect_tag(obj, expected)?;
            pick(&obj.payload)
        })
        .map(|addr| RawValue::borrowed(ptr(addr)))
    }

    fn read_count(
        &self,
        value: RawValue,
        expected: &[TypeTag],
        count: impl FnOnce(&Payload) -> Option<usize>,
    ) -> Result<u64, NativeState> {
        self.read(value, |_, obj| {
            expect_tag(obj, expected)?;
            count(&obj.payload)
                .map(|n| n as u64)
                .ok_or_else(|| format!("corrupt {} value", obj.ty))
        })
    }

    fn alloc_string(&self, bytes: Vec<u8>) -> RawString {
        RawString {
            ptr: ptr(self.slab.lock().insert(Object::String(bytes))),
        }
    }

    fn write_string(&self, out: &mut RawString, bytes: Result<Vec<u8>, NativeState>) -> NativeState {
        match bytes {
            Ok(bytes) => {
                *out = self.alloc_string(bytes);
                NativeState::Success
            }
            Err(state) => state,
        }
    }

    fn alloc_type(&self, ty: LogicalType) -> RawLogicalType {
        RawLogicalType {
            ptr: ptr(self.slab.lock().insert(Object::LogicalType(ty))),
        }
    }

    fn logical_type<T>(&self, ty: RawLogicalType, f: impl FnOnce(&LogicalType) -> T) -> Option<T> {
        match self.slab.lock().get(ty.ptr.addr()) {
            Some(Object::LogicalType(logical)) => Some(f(logical)),
            _ => {
                self.stats.dangling_access();
                None
            }
        }
    }

    fn result<T>(
        &self,
        result: RawQueryResult,
        f: impl FnOnce(&ResultObject) -> Result<T, String>,
    ) -> Result<T, NativeState> {
        match self.slab.lock().get(result.ptr.addr()) {
            Some(Object::QueryResult(res)) => f(res).map_err(fail),
            _ => {
                self.stats.dangling_access();
                Err(fail(format!("invalid query result pointer {:?}", result.ptr)))
            }
        }
    }

    /// Resolves a row descriptor to the address of cell `index`.
    fn tuple_cell(&self, tuple: RawFlatTuple, index: Option<u64>) -> Result<Vec<usize>, NativeState> {
        let slab = self.slab.lock();
        let cells = match slab.get(tuple.ptr.addr()) {
            Some(Object::FlatTuple { result }) => match slab.get(*result) {
                Some(Object::QueryResult(res)) => res.buffer.clone(),
                _ => {
                    self.stats.dangling_access();
                    return Err(fail("row buffer belongs to a destroyed query result"));
                }
            },
            _ => {
                self.stats.dangling_access();
                return Err(fail(format!("invalid flat tuple pointer {:?}", tuple.ptr)));
            }
        };
        match index {
            None => Ok(cells),
            Some(index) => at(&cells, index, "tuple").map(|cell| vec![cell]).map_err(fail),
        }
    }

    fn create(&self, value: Value) -> RawValue {
        self.load_value(&value)
    }

    fn create_timestamp(&self, value: NativeTimestamp, unit: TimestampUnit) -> RawValue {
        self.create(Value::Timestamp(Timestamp::new(value.value, unit)))
    }

    /// Deep-copies `sources` as children of a new caller-owned value.
    fn create_composite(
        &self,
        ty: LogicalType,
        sources: &[usize],
        assemble: impl FnOnce(Children) -> Payload,
    ) -> Result<RawValue, NativeState> {
        let mut slab = self.slab.lock();
        if let Some(missing) = sources.iter().find(|addr| slab.value(**addr).is_none()) {
            self.stats.dangling_access();
            return Err(fail(format!("invalid value pointer {:?}", ptr(*missing))));
        }
        let addr = slab.reserve();
        let mut children = Children::new();
        for source in sources {
            match slab.deep_copy(*source, Some(addr)) {
                Some(child) => children.push(child),
                None => {
                    for child in children {
                        slab.free_value_tree(child);
                    }
                    return Err(fail("failed to copy composite element"));
                }
            }
        }
        slab.put(
            addr,
            Object::Value(ValueObject {
                ty,
                is_null: false,
                payload: assemble(children),
                parent: None,
            }),
        );
        Ok(RawValue::owned(ptr(addr)))
    }

    /// Removes a non-value object, counting frees of anything else.
    fn destroy_object(&self, kind: DestroyKind, addr: usize, is_kind: fn(&Object) -> bool) -> Option<Object> {
        let mut slab = self.slab.lock();
        match slab.get(addr) {
            Some(object) if is_kind(object) => slab.remove(addr),
            _ => {
                warn!(?kind, addr = format_args!("{addr:#x}"), "invalid free");
                self.stats.invalid_free();
                None
            }
        }
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! scalar_getters {
    ($($name:ident($tag:ident) -> $ty:ty { $pat:pat => $out:expr }),* $(,)?) => {
        $(
            fn $name(&self, value: RawValue, out: &mut $ty) -> NativeState {
                let read = self.read_scalar(value, TypeTag::$tag, |scalar| match scalar {
                    $pat => Some($out),
                    _ => None,
                });
                write_out(out, read)
            }
        )*
    };
}

impl NativeApi for MemoryEngine {
    fn last_error(&self) -> Option<String> {
        LAST_ERROR.with(|cell| cell.borrow().clone())
    }

    fn string_read(&self, string: RawString, out: &mut Vec<u8>) -> NativeState {
        match self.slab.lock().get(string.ptr.addr()) {
            Some(Object::String(bytes)) => {
                out.clear();
                out.extend_from_slice(bytes);
                NativeState::Success
            }
            _ => {
                self.stats.dangling_access();
                fail(format!("invalid string pointer {:?}", string.ptr))
            }
        }
    }

    fn destroy_string(&self, string: RawString) {
        let _guard = self.stats.enter_destroy(DestroyKind::String);
        self.destroy_object(DestroyKind::String, string.ptr.addr(), |object| {
            matches!(object, Object::String(_))
        });
    }

    fn value_get_data_type(&self, value: RawValue, out: &mut RawLogicalType) -> NativeState {
        match self.read(value, |_, obj| Ok(obj.ty.clone())) {
            Ok(ty) => {
                *out = self.alloc_type(ty);
                NativeState::Success
            }
            Err(state) => state,
        }
    }

    fn data_type_get_id(&self, ty: RawLogicalType) -> u32 {
        self.logical_type(ty, LogicalType::native_id)
            .unwrap_or(TypeTag::Any.native_id())
    }

    fn data_type_get_child_type(&self, ty: RawLogicalType, out: &mut RawLogicalType) -> NativeState {
        match self.logical_type(ty, |logical| logical.child().cloned()) {
            Some(Some(child)) => {
                *out = self.alloc_type(child);
                NativeState::Success
            }
            Some(None) => fail("type has no child type"),
            None => fail(format!("invalid logical type pointer {:?}", ty.ptr)),
        }
    }

    fn data_type_get_num_elements_in_array(&self, ty: RawLogicalType, out: &mut u64) -> NativeState {
        match self.logical_type(ty, LogicalType::array_size) {
            Some(Some(size)) => {
                *out = size;
                NativeState::Success
            }
            Some(None) => fail("type is not a fixed-size array"),
            None => fail(format!("invalid logical type pointer {:?}", ty.ptr)),
        }
    }

    fn data_type_destroy(&self, ty: RawLogicalType) {
        let _guard = self.stats.enter_destroy(DestroyKind::LogicalType);
        self.destroy_object(DestroyKind::LogicalType, ty.ptr.addr(), |object| {
            matches!(object, Object::LogicalType(_))
        });
    }

    fn value_is_null(&self, value: RawValue) -> bool {
        self.read(value, |_, obj| Ok(obj.is_null)).unwrap_or(false)
    }

    fn value_set_null(&self, value: RawValue, is_null: bool) {
        match self.slab.lock().get_mut(value.ptr.addr()) {
            Some(Object::Value(obj)) => obj.is_null = is_null,
            _ => self.stats.dangling_access(),
        }
    }

    fn value_clone(&self, value: RawValue, out: &mut RawValue) -> NativeState {
        let copied = self.slab.lock().deep_copy(value.ptr.addr(), None);
        match copied {
            Some(addr) => {
                *out = RawValue::owned(ptr(addr));
                NativeState::Success
            }
            None => {
                self.stats.dangling_access();
                fail(format!("invalid value pointer {:?}", value.ptr))
            }
        }
    }

    fn value_copy(&self, value: RawValue, other: RawValue) -> NativeState {
        let copied = self
            .slab
            .lock()
            .copy_into(value.ptr.addr(), other.ptr.addr());
        match copied {
            Some(()) => NativeState::Success,
            None => {
                self.stats.dangling_access();
                fail("invalid value pointer in copy")
            }
        }
    }

    fn value_destroy(&self, value: RawValue) {
        let _guard = self.stats.enter_destroy(DestroyKind::Value);
        if value.owned_by_engine {
            // engine-owned views are freed with their parent
            self.stats.borrowed_destroy();
            return;
        }
        let addr = value.ptr.addr();
        let mut slab = self.slab.lock();
        match slab.value(addr).map(|obj| obj.parent) {
            Some(None) => {
                slab.free_value_tree(addr);
                trace!(addr = format_args!("{addr:#x}"), "destroyed value");
            }
            Some(Some(parent)) => {
                warn!(
                    addr = format_args!("{addr:#x}"),
                    parent = format_args!("{parent:#x}"),
                    "value_destroy on a child value"
                );
                self.stats.invalid_free();
            }
            None => {
                warn!(addr = format_args!("{addr:#x}"), "value_destroy on unknown address");
                self.stats.invalid_free();
            }
        }
    }

    fn value_to_string(&self, value: RawValue, out: &mut RawString) -> NativeState {
        let text = self.read(value, |slab, _| {
            slab.snapshot(value.ptr.addr())
                .map(|snapshot| render(&snapshot).into_bytes())
                .ok_or_else(|| "corrupt value".to_string())
        });
        self.write_string(out, text)
    }

    scalar_getters! {
        value_get_bool(Bool) -> bool { Value::Bool(b) => *b },
        value_get_int8(Int8) -> i8 { Value::Int8(v) => *v },
        value_get_int16(Int16) -> i16 { Value::Int16(v) => *v },
        value_get_int32(Int32) -> i32 { Value::Int32(v) => *v },
        value_get_int64(Int64) -> i64 { Value::Int64(v) => *v },
        value_get_uint8(UInt8) -> u8 { Value::UInt8(v) => *v },
        value_get_uint16(UInt16) -> u16 { Value::UInt16(v) => *v },
        value_get_uint32(UInt32) -> u32 { Value::UInt32(v) => *v },
        value_get_uint64(UInt64) -> u64 { Value::UInt64(v) => *v },
        value_get_int128(Int128) -> NativeInt128 { Value::Int128(v) => NativeInt128::from_i128(*v) },
        value_get_float(Float) -> f32 { Value::Float(v) => *v },
        value_get_double(Double) -> f64 { Value::Double(v) => *v },
        value_get_date(Date) -> NativeDate { Value::Date(d) => NativeDate { days: d.days() } },
        value_get_timestamp(Timestamp) -> NativeTimestamp {
            Value::Timestamp(ts) => NativeTimestamp { value: ts.value() }
        },
        value_get_timestamp_sec(TimestampSec) -> NativeTimestamp {
            Value::Timestamp(ts) => NativeTimestamp { value: ts.value() }
        },
        value_get_timestamp_ms(TimestampMs) -> NativeTimestamp {
            Value::Timestamp(ts) => NativeTimestamp { value: ts.value() }
        },
        value_get_timestamp_ns(TimestampNs) -> NativeTimestamp {
            Value::Timestamp(ts) => NativeTimestamp { value: ts.value() }
        },
        value_get_timestamp_tz(TimestampTz) -> NativeTimestamp {
            Value::Timestamp(ts) => NativeTimestamp { value: ts.value() }
        },
        value_get_interval(Interval) -> NativeInterval {
            Value::Interval(i) => NativeInterval { months: i.months, days: i.days, micros: i.micros }
        },
        value_get_internal_id(InternalId) -> NativeInternalId {
            Value::InternalId(id) => NativeInternalId { table_id: id.table_id, offset: id.offset }
        },
    }

    fn value_get_string(&self, value: RawValue, out: &mut RawString) -> NativeState {
        let text = self.read_scalar(value, TypeTag::String, |scalar| match scalar {
            Value::String(s) => Some(s.as_bytes().to_vec()),
            _ => None,
        });
        self.write_string(out, text)
    }

    fn value_get_blob(&self, value: RawValue, out: &mut RawString) -> NativeState {
        let text = self.read_scalar(value, TypeTag::Blob, |scalar| match scalar {
            Value::Blob(bytes) => Some(hex::encode(bytes).into_bytes()),
            _ => None,
        });
        self.write_string(out, text)
    }

    fn value_get_uuid(&self, value: RawValue, out: &mut RawString) -> NativeState {
        let text = self.read_scalar(value, TypeTag::Uuid, |scalar| match scalar {
            Value::Uuid(uuid) => Some(uuid.to_string().into_bytes()),
            _ => None,
        });
        self.write_string(out, text)
    }

    fn value_get_list_size(&self, value: RawValue, out: &mut u64) -> NativeState {
        self.stats.list_size_read();
        let read = self.read_count(value, &[TypeTag::List, TypeTag::Array], |payload| match payload {
            Payload::List(items) => Some(items.len()),
            _ => None,
        });
        write_out(out, read)
    }

    fn value_get_list_element(&self, value: RawValue, index: u64, out: &mut RawValue) -> NativeState {
        self.stats.list_element_read();
        let read = self.read(value, |_, obj| {
            expect_tag(obj, &[TypeTag::List, TypeTag::Array])?;
            match &obj.payload {
                Payload::List(items) => at(items, index, "list"),
                _ => Err("corrupt list value".into()),
            }
        });
        write_out(out, read.map(|addr| RawValue::borrowed(ptr(addr))))
    }

    fn value_get_struct_num_fields(&self, value: RawValue, out: &mut u64) -> NativeState {
        let read = self.read_count(value, &[TypeTag::Struct], |payload| match payload {
            Payload::Struct(fields) => Some(fields.len()),
            _ => None,
        });
        write_out(out, read)
    }

    fn value_get_struct_field_name(&self, value: RawValue, index: u64, out: &mut RawString) -> NativeState {
        let name = self.read(value, |_, obj| {
            expect_tag(obj, &[TypeTag::Struct])?;
            match &obj.payload {
                Payload::Struct(fields) => at(fields, index, "struct field").map(|(name, _)| name.into_bytes()),
                _ => Err("corrupt struct value".into()),
            }
        });
        self.write_string(out, name)
    }

    fn value_get_struct_field_value(&self, value: RawValue, index: u64, out: &mut RawValue) -> NativeState {
        let read = self.read_child(value, &[TypeTag::Struct], |payload| match payload {
            Payload::Struct(fields) => at(fields, index, "struct field").map(|(_, addr)| addr),
            _ => Err("corrupt struct value".into()),
        });
        write_out(out, read)
    }

    fn value_get_map_size(&self, value: RawValue, out: &mut u64) -> NativeState {
        let read = self.read_count(value, &[TypeTag::Map], |payload| match payload {
            Payload::Map(entries) => Some(entries.len()),
            _ => None,
        });
        write_out(out, read)
    }

    fn value_get_map_key(&self, value: RawValue, index: u64, out: &mut RawValue) -> NativeState {
        let read = self.read_child(value, &[TypeTag::Map], |payload| match payload {
            Payload::Map(entries) => at(entries, index, "map").map(|(key, _)| key),
            _ => Err("corrupt map value".into()),
        });
        write_out(out, read)
    }

    fn value_get_map_value(&self, value: RawValue, index: u64, out: &mut RawValue) -> NativeState {
        let read = self.read_child(value, &[TypeTag::Map], |payload| match payload {
            Payload::Map(entries) => at(entries, index, "map").map(|(_, value)| value),
            _ => Err("corrupt map value".into()),
        });
        write_out(out, read)
    }

    fn node_val_get_id_val(&self, node: RawValue, out: &mut RawValue) -> NativeState {
        let read = self.read_child(node, &[TypeTag::Node], |payload| match payload {
            Payload::Node { id, .. } => Ok(*id),
            _ => Err("corrupt node value".into()),
        });
        write_out(out, read)
    }

    fn node_val_get_label_val(&self, node: RawValue, out: &mut RawValue) -> NativeState {
        let read = self.read_child(node, &[TypeTag::Node], |payload| match payload {
            Payload::Node { label, .. } => Ok(*label),
            _ => Err("corrupt node value".into()),
        });
        write_out(out, read)
    }

    fn node_val_get_property_size(&self, node: RawValue, out: &mut u64) -> NativeState {
        let read = self.read_count(node, &[TypeTag::Node], |payload| match payload {
            Payload::Node { properties, .. } => Some(properties.len()),
            _ => None,
        });
        write_out(out, read)
    }

    fn node_val_get_property_name_at(&self, node: RawValue, index: u64, out: &mut RawString) -> NativeState {
        let name = self.read(node, |_, obj| {
            expect_tag(obj, &[TypeTag::Node])?;
            match &obj.payload {
                Payload::Node { properties, .. } => {
                    at(properties, index, "property").map(|(name, _)| name.into_bytes())
                }
                _ => Err("corrupt node value".into()),
            }
        });
        self.write_string(out, name)
    }

    fn node_val_get_property_value_at(&self, node: RawValue, index: u64, out: &mut RawValue) -> NativeState {
        let read = self.read_child(node, &[TypeTag::Node], |payload| match payload {
            Payload::Node { properties, .. } => at(properties, index, "property").map(|(_, addr)| addr),
            _ => Err("corrupt node value".into()),
        });
        write_out(out, read)
    }

    fn rel_val_get_id_val(&self, rel: RawValue, out: &mut RawValue) -> NativeState {
        let read = self.read_child(rel, &[TypeTag::Rel], |payload| match payload {
            Payload::Rel { id, .. } => Ok(*id),
            _ => Err("corrupt rel value".into()),
        });
        write_out(out, read)
    }

    fn rel_val_get_src_id_val(&self, rel: RawValue, out: &mut RawValue) -> NativeState {
        let read = self.read_child(rel, &[TypeTag::Rel], |payload| match payload {
            Payload::Rel { src, .. } => Ok(*src),
            _ => Err("corrupt rel value".into()),
        });
        write_out(out, read)
    }

    fn rel_val_get_dst_id_val(&self, rel: RawValue, out: &mut RawValue) -> NativeState {
        let read = self.read_child(rel, &[TypeTag::Rel], |payload| match payload {
            Payload::Rel { dst, .. } => Ok(*dst),
            _ => Err("corrupt rel value".into()),
        });
        write_out(out, read)
    }

    fn rel_val_get_label_val(&self, rel: RawValue, out: &mut RawValue) -> NativeState {
        let read = self.read_child(rel, &[TypeTag::Rel], |payload| match payload {
            Payload::Rel { label, .. } => Ok(*label),
            _ => Err("corrupt rel value".into()),
        });
        write_out(out, read)
    }

    fn rel_val_get_property_size(&self, rel: RawValue, out: &mut u64) -> NativeState {
        let read = self.read_count(rel, &[TypeTag::Rel], |payload| match payload {
            Payload::Rel { properties, .. } => Some(properties.len()),
            _ => None,
        });
        write_out(out, read)
    }

    fn rel_val_get_property_name_at(&self, rel: RawValue, index: u64, out: &mut RawString) -> NativeState {
        let name = self.read(rel, |_, obj| {
            expect_tag(obj, &[TypeTag::Rel])?;
            match &obj.payload {
                Payload::Rel { properties, .. } => {
                    at(properties, index, "property").map(|(name, _)| name.into_bytes())
                }
                _ => Err("corrupt rel value".into()),
            }
        });
        self.write_string(out, name)
    }

    fn rel_val_get_property_value_at(&self, rel: RawValue, index: u64, out: &mut RawValue) -> NativeState {
        let read = self.read_child(rel, &[TypeTag::Rel], |payload| match payload {
            Payload::Rel { properties, .. } => at(properties, index, "property").map(|(_, addr)| addr),
            _ => Err("corrupt rel value".into()),
        });
        write_out(out, read)
    }

    fn value_get_recursive_rel_node_list(&self, value: RawValue, out: &mut RawValue) -> NativeState {
        let read = self.read_child(value, &[TypeTag::RecursiveRel], |payload| match payload {
            Payload::RecursiveRel { nodes, .. } => Ok(*nodes),
            _ => Err("corrupt recursive rel value".into()),
        });
        write_out(out, read)
    }

    fn value_get_recursive_rel_rel_list(&self, value: RawValue, out: &mut RawValue) -> NativeState {
        let read = self.read_child(value, &[TypeTag::RecursiveRel], |payload| match payload {
            Payload::RecursiveRel { rels, .. } => Ok(*rels),
            _ => Err("corrupt recursive rel value".into()),
        });
        write_out(out, read)
    }

    fn value_create_null(&self) -> RawValue {
        self.create(Value::Null)
    }

    fn value_create_bool(&self, value: bool) -> RawValue {
        self.create(Value::Bool(value))
    }

    fn value_create_int8(&self, value: i8) -> RawValue {
        self.create(Value::Int8(value))
    }

    fn value_create_int16(&self, value: i16) -> RawValue {
        self.create(Value::Int16(value))
    }

    fn value_create_int32(&self, value: i32) -> RawValue {
        self.create(Value::Int32(value))
    }

    fn value_create_int64(&self, value: i64) -> RawValue {
        self.create(Value::Int64(value))
    }

    fn value_create_uint8(&self, value: u8) -> RawValue {
        self.create(Value::UInt8(value))
    }

    fn value_create_uint16(&self, value: u16) -> RawValue {
        self.create(Value::UInt16(value))
    }

    fn value_create_uint32(&self, value: u32) -> RawValue {
        self.create(Value::UInt32(value))
    }

    fn value_create_uint64(&self, value: u64) -> RawValue {
        self.create(Value::UInt64(value))
    }

    fn value_create_int128(&self, value: NativeInt128) -> RawValue {
        self.create(Value::Int128(value.to_i128()))
    }

    fn value_create_float(&self, value: f32) -> RawValue {
        self.create(Value::Float(value))
    }

    fn value_create_double(&self, value: f64) -> RawValue {
        self.create(Value::Double(value))
    }

    fn value_create_date(&self, value: NativeDate) -> RawValue {
        self.create(Value::Date(Date::from_days(value.days)))
    }

    fn value_create_timestamp(&self, value: NativeTimestamp) -> RawValue {
        self.create_timestamp(value, TimestampUnit::Micros)
    }

    fn value_create_timestamp_sec(&self, value: NativeTimestamp) -> RawValue {
        self.create_timestamp(value, TimestampUnit::Seconds)
    }

    fn value_create_timestamp_ms(&self, value: NativeTimestamp) -> RawValue {
        self.create_timestamp(value, TimestampUnit::Millis)
    }

    fn value_create_timestamp_ns(&self, value: NativeTimestamp) -> RawValue {
        self.create_timestamp(value, TimestampUnit::Nanos)
    }

    fn value_create_timestamp_tz(&self, value: NativeTimestamp) -> RawValue {
        self.create_timestamp(value, TimestampUnit::MicrosTz)
    }

    fn value_create_interval(&self, value: NativeInterval) -> RawValue {
        self.create(Value::Interval(Interval::new(value.months, value.days, value.micros)))
    }

    fn value_create_internal_id(&self, value: NativeInternalId) -> RawValue {
        self.create(Value::InternalId(InternalId::new(value.table_id, value.offset)))
    }

    fn value_create_string(&self, value: &str) -> RawValue {
        self.create(Value::String(value.to_string()))
    }

    fn value_create_blob(&self, value: &[u8]) -> RawValue {
        self.create(Value::Blob(value.to_vec()))
    }

    fn value_create_uuid(&self, value: &str, out: &mut RawValue) -> NativeState {
        match Uuid::parse_str(value) {
            Ok(uuid) => {
                *out = self.create(Value::Uuid(uuid));
                NativeState::Success
            }
            Err(err) => fail(format!("invalid UUID '{value}': {err}")),
        }
    }

    fn value_create_list(&self, elements: &[RawValue], out: &mut RawValue) -> NativeState {
        let element_type = {
            let slab = self.slab.lock();
            let mut element_type: Option<LogicalType> = None;
            for element in elements {
                let Some(obj) = slab.value(element.ptr.addr()) else {
                    continue;
                };
                if obj.is_null {
                    continue;
                }
                match &element_type {
                    None => element_type = Some(obj.ty.clone()),
                    Some(ty) if *ty != obj.ty => {
                        return fail(format!(
                            "list elements must share one type, found {ty} and {}",
                            obj.ty
                        ));
                    }
                    Some(_) => {}
                }
            }
            element_type.unwrap_or_else(|| LogicalType::scalar(TypeTag::Any))
        };
        let sources: Vec<usize> = elements.iter().map(|e| e.ptr.addr()).collect();
        let created = self.create_composite(LogicalType::list(element_type), &sources, Payload::List);
        write_out(out, created)
    }

    fn value_create_struct(&self, names: &[&str], values: &[RawValue], out: &mut RawValue) -> NativeState {
        if names.len() != values.len() {
            return fail(format!(
                "struct has {} names but {} values",
                names.len(),
                values.len()
            ));
        }
        let sources: Vec<usize> = values.iter().map(|v| v.ptr.addr()).collect();
        let created = self.create_composite(LogicalType::scalar(TypeTag::Struct), &sources, |children| {
            Payload::Struct(
                names
                    .iter()
                    .map(|name| (*name).to_string())
                    .zip(children)
                    .collect(),
            )
        });
        write_out(out, created)
    }

    fn value_create_map(&self, keys: &[RawValue], values: &[RawValue], out: &mut RawValue) -> NativeState {
        if keys.len() != values.len() {
            return fail(format!(
                "map has {} keys but {} values",
                keys.len(),
                values.len()
            ));
        }
        let sources: Vec<usize> = keys
            .iter()
            .zip(values)
            .flat_map(|(k, v)| [k.ptr.addr(), v.ptr.addr()])
            .collect();
        let created = self.create_composite(LogicalType::scalar(TypeTag::Map), &sources, |children| {
            Payload::Map(children.chunks(2).map(|pair| (pair[0], pair[1])).collect())
        });
        write_out(out, created)
    }

    fn query_result_is_success(&self, result: RawQueryResult) -> bool {
        self.result(result, |res| Ok(res.set.error.is_none()))
            .unwrap_or(false)
    }

    fn query_result_get_error_message(&self, result: RawQueryResult, out: &mut RawString) -> NativeState {
        let message = self.result(result, |res| {
            res.set
                .error
                .as_ref()
                .map(|message| message.as_bytes().to_vec())
                .ok_or_else(|| "query succeeded".to_string())
        });
        self.write_string(out, message)
    }

    fn query_result_get_num_columns(&self, result: RawQueryResult) -> u64 {
        self.result(result, |res| Ok(res.set.columns.len() as u64))
            .unwrap_or(0)
    }

    fn query_result_get_column_name(&self, result: RawQueryResult, index: u64, out: &mut RawString) -> NativeState {
        let name = self.result(result, |res| {
            res.column(index)
                .map(|(name, _)| name.as_bytes().to_vec())
                .ok_or_else(|| format!("column index {index} out of range"))
        });
        self.write_string(out, name)
    }

    fn query_result_get_column_data_type(
        &self,
        result: RawQueryResult,
        index: u64,
        out: &mut RawLogicalType,
    ) -> NativeState {
        let ty = self.result(result, |res| {
            res.column(index)
                .map(|(_, ty)| ty.clone())
                .ok_or_else(|| format!("column index {index} out of range"))
        });
        match ty {
            Ok(ty) => {
                *out = self.alloc_type(ty);
                NativeState::Success
            }
            Err(state) => state,
        }
    }

    fn query_result_get_num_tuples(&self, result: RawQueryResult) -> u64 {
        self.result(result, |res| Ok(res.set.rows.len() as u64))
            .unwrap_or(0)
    }

    fn query_result_get_query_summary(&self, result: RawQueryResult, out: &mut NativeQuerySummary) -> NativeState {
        let read = self.result(result, |res| Ok(res.set.summary));
        write_out(out, read)
    }

    fn query_result_has_next(&self, result: RawQueryResult) -> bool {
        self.result(result, |res| Ok(res.has_next())).unwrap_or(false)
    }

    fn query_result_get_next(&self, result: RawQueryResult, out: &mut RawFlatTuple) -> NativeState {
        let addr = result.ptr.addr();
        let mut slab = self.slab.lock();
        let (row, types, mut buffer) = match slab.get_mut(addr) {
            Some(Object::QueryResult(res)) => {
                if !res.has_next() {
                    return fail("no more tuples");
                }
                let row = res.set.rows[res.position].clone();
                res.position += 1;
                let types: Vec<LogicalType> =
                    res.set.columns.iter().map(|(_, ty)| ty.clone()).collect();
                (row, types, std::mem::take(&mut res.buffer))
            }
            _ => {
                self.stats.dangling_access();
                return fail(format!("invalid query result pointer {:?}", result.ptr));
            }
        };

        let null = Value::Null;
        if buffer.is_empty() {
            for (i, ty) in types.iter().enumerate() {
                let cell = row.get(i).unwrap_or(&null);
                buffer.push(slab.alloc_value(cell, type_for(cell, ty), Some(addr)));
            }
        } else {
            for (i, (cell_addr, ty)) in buffer.iter().zip(&types).enumerate() {
                let cell = row.get(i).unwrap_or(&null);
                slab.rebuild_value(*cell_addr, cell, type_for(cell, ty));
            }
        }
        if let Some(Object::QueryResult(res)) = slab.get_mut(addr) {
            res.buffer = buffer;
        }

        let tuple = slab.insert(Object::FlatTuple { result: addr });
        *out = RawFlatTuple {
            ptr: ptr(tuple),
            owned_by_engine: false,
        };
        NativeState::Success
    }

    fn query_result_reset_iterator(&self, result: RawQueryResult) {
        match self.slab.lock().get_mut(result.ptr.addr()) {
            Some(Object::QueryResult(res)) => res.position = 0,
            _ => self.stats.dangling_access(),
        }
    }

    fn query_result_to_string(&self, result: RawQueryResult, out: &mut RawString) -> NativeState {
        let table = self.result(result, |res| {
            Ok(render_table(&res.set.columns, &res.set.rows).into_bytes())
        });
        self.write_string(out, table)
    }

    fn query_result_destroy(&self, result: RawQueryResult) {
        let _guard = self.stats.enter_destroy(DestroyKind::QueryResult);
        let removed = self.destroy_object(DestroyKind::QueryResult, result.ptr.addr(), |object| {
            matches!(object, Object::QueryResult(_))
        });
        if let Some(Object::QueryResult(res)) = removed {
            let mut slab = self.slab.lock();
            for cell in res.buffer {
                slab.free_value_tree(cell);
            }
            trace!(addr = format_args!("{:#x}", result.ptr.addr()), "destroyed query result");
        }
    }

    fn flat_tuple_get_value(&self, tuple: RawFlatTuple, index: u64, out: &mut RawValue) -> NativeState {
        let cell = self
            .tuple_cell(tuple, Some(index))
            .map(|cells| RawValue::borrowed(ptr(cells[0])));
        write_out(out, cell)
    }

    fn flat_tuple_to_string(&self, tuple: RawFlatTuple, out: &mut RawString) -> NativeState {
        let text = self.tuple_cell(tuple, None).map(|cells| {
            let slab = self.slab.lock();
            let values: Vec<Value> = cells
                .iter()
                .map(|cell| slab.snapshot(*cell).unwrap_or(Value::Null))
                .collect();
            render_row(&values).into_bytes()
        });
        self.write_string(out, text)
    }

    fn flat_tuple_destroy(&self, tuple: RawFlatTuple) {
        let _guard = self.stats.enter_destroy(DestroyKind::FlatTuple);
        self.destroy_object(DestroyKind::FlatTuple, tuple.ptr.addr(), |object| {
            matches!(object, Object::FlatTuple { .. })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlink_common::types::NodeSnapshot;

    fn read_string(engine: &MemoryEngine, string: RawString) -> String {
        let mut bytes = Vec::new();
        assert_eq!(engine.string_read(string, &mut bytes), NativeState::Success);
        engine.destroy_string(string);
        String::from_utf8(bytes).unwrap()
    }

    fn people() -> ResultSet {
        ResultSet::new()
            .column("name", TypeTag::String)
            .column("age", TypeTag::Int64)
            .row(vec![Value::from("Alice"), Value::Int64(30)])
            .row(vec![Value::from("Bob"), Value::Null])
    }

    #[test]
    fn test_scalar_get_and_mismatch() {
        let engine = MemoryEngine::new();
        let value = engine.load_value(&Value::Int32(7));

        let mut out = 0i32;
        assert_eq!(engine.value_get_int32(value, &mut out), NativeState::Success);
        assert_eq!(out, 7);

        let mut wrong = 0i64;
        assert_eq!(engine.value_get_int64(value, &mut wrong), NativeState::Error);
        assert_eq!(
            engine.last_error().as_deref(),
            Some("expected INT64 value, found INT32")
        );

        engine.value_destroy(value);
        assert_eq!(engine.live_objects(), 0);
        assert_eq!(engine.stats().invalid_frees, 0);
    }

    #[test]
    fn test_blob_is_hex_text() {
        let engine = MemoryEngine::new();
        let value = engine.load_value(&Value::Blob(vec![0x00, 0xFF, 0x10]));
        let mut text = RawString::default();
        assert_eq!(engine.value_get_blob(value, &mut text), NativeState::Success);
        assert_eq!(read_string(&engine, text), "00ff10");
        engine.value_destroy(value);
    }

    #[test]
    fn test_children_are_engine_owned() {
        let engine = MemoryEngine::new();
        let list = engine.load_value(&Value::List(vec![Value::Int64(1), Value::Int64(2)]));

        let mut child = RawValue::default();
        assert_eq!(engine.value_get_list_element(list, 1, &mut child), NativeState::Success);
        assert!(child.owned_by_engine);

        // destroying a borrowed view is a no-op
        engine.value_destroy(child);
        assert_eq!(engine.stats().borrowed_destroys, 1);
        assert_eq!(engine.live_objects(), 3);

        engine.value_destroy(list);
        assert_eq!(engine.live_objects(), 0);
    }

    #[test]
    fn test_double_free_is_counted() {
        let engine = MemoryEngine::new();
        let value = engine.load_value(&Value::Bool(true));
        engine.value_destroy(value);
        engine.value_destroy(value);
        assert_eq!(engine.stats().invalid_frees, 1);
    }

    #[test]
    fn test_row_buffer_is_shared() {
        let engine = MemoryEngine::new();
        let result = engine.open_result(people());
        assert!(engine.query_result_is_success(result));
        assert_eq!(engine.query_result_get_num_columns(result), 2);

        let mut first = RawFlatTuple::default();
        assert_eq!(engine.query_result_get_next(result, &mut first), NativeState::Success);
        let mut cell = RawValue::default();
        assert_eq!(engine.flat_tuple_get_value(first, 0, &mut cell), NativeState::Success);
        assert_eq!(engine.peek_value(cell), Some(Value::from("Alice")));

        let mut second = RawFlatTuple::default();
        assert_eq!(engine.query_result_get_next(result, &mut second), NativeState::Success);
        // same cell, overwritten in place
        assert_eq!(engine.peek_value(cell), Some(Value::from("Bob")));

        let mut age = RawValue::default();
        assert_eq!(engine.flat_tuple_get_value(second, 1, &mut age), NativeState::Success);
        assert!(engine.value_is_null(age));
        let mut ty = RawLogicalType::default();
        assert_eq!(engine.value_get_data_type(age, &mut ty), NativeState::Success);
        assert_eq!(engine.data_type_get_id(ty), TypeTag::Int64.native_id());
        engine.data_type_destroy(ty);

        assert!(!engine.query_result_has_next(result));
        assert_eq!(engine.query_result_get_next(result, &mut second), NativeState::Error);

        engine.flat_tuple_destroy(first);
        engine.flat_tuple_destroy(second);
        engine.query_result_destroy(result);
        assert_eq!(engine.live_objects(), 0);
        assert_eq!(engine.stats().invalid_frees, 0);
    }

    #[test]
    fn test_failed_result() {
        let engine = MemoryEngine::new();
        let result = engine.open_result(ResultSet::failed("Parser exception: bad input"));
        assert!(!engine.query_result_is_success(result));
        let mut message = RawString::default();
        assert_eq!(
            engine.query_result_get_error_message(result, &mut message),
            NativeState::Success
        );
        assert_eq!(read_string(&engine, message), "Parser exception: bad input");
        engine.query_result_destroy(result);
    }

    #[test]
    fn test_create_list_copies_elements() {
        let engine = MemoryEngine::new();
        let a = engine.value_create_int64(1);
        let b = engine.value_create_int64(2);
        let mut list = RawValue::default();
        assert_eq!(engine.value_create_list(&[a, b], &mut list), NativeState::Success);
        engine.value_destroy(a);
        engine.value_destroy(b);
        assert_eq!(
            engine.peek_value(list),
            Some(Value::List(vec![Value::Int64(1), Value::Int64(2)]))
        );

        let s = engine.value_create_string("x");
        let mut mixed = RawValue::default();
        assert_eq!(engine.value_create_list(&[list, s], &mut mixed), NativeState::Error);

        engine.value_destroy(s);
        engine.value_destroy(list);
        assert_eq!(engine.live_objects(), 0);
    }

    #[test]
    fn test_node_accessors() {
        let engine = MemoryEngine::new();
        let node = engine.load_value(&Value::Node(NodeSnapshot {
            id: InternalId::new(1, 4),
            label: "City".into(),
            properties: vec![("name".into(), Value::from("Oslo"))],
        }));

        let mut id = RawValue::default();
        assert_eq!(engine.node_val_get_id_val(node, &mut id), NativeState::Success);
        let mut raw_id = NativeInternalId::default();
        assert_eq!(engine.value_get_internal_id(id, &mut raw_id), NativeState::Success);
        assert_eq!((raw_id.table_id, raw_id.offset), (1, 4));

        let mut name = RawString::default();
        assert_eq!(
            engine.node_val_get_property_name_at(node, 0, &mut name),
            NativeState::Success
        );
        assert_eq!(read_string(&engine, name), "name");

        assert_eq!(
            engine.node_val_get_property_name_at(node, 1, &mut name),
            NativeState::Error
        );

        engine.value_destroy(node);
        assert_eq!(engine.live_objects(), 0);
    }
}
