//! Typed wrappers over native values.
//!
//! [`dispatch`] reads a value's declared type once and picks the matching
//! [`NativeValue`] variant. Wrappers read nothing else up front: every
//! accessor is one native call, and composite children are fetched on demand.
//!
//! The lifetime parameter is the lifetime of whatever owns the native memory.
//! Values created or cloned by the caller are `'static`; a row cell borrows
//! its row, and a list element borrows its list.

mod composite;
mod graph;
mod scalar;
mod temporal;
mod text;

pub use composite::{ArrayValue, ListIter, ListValue, MapValue, StructValue};
pub use graph::{NodeValue, PropertyIndex, RecursiveRelValue, RelValue};
pub use scalar::{
    BoolValue, DoubleValue, FloatValue, Int8Value, Int16Value, Int32Value, Int64Value,
    Int128Value, InternalIdValue, UInt8Value, UInt16Value, UInt32Value, UInt64Value,
};
pub use temporal::{DateValue, IntervalValue, TimestampValue};
pub use text::{BlobValue, StringValue, UuidValue};

use std::cell::OnceCell;
use std::fmt;

use graphlink_common::types::{LogicalType, TypeTag, Value};
use graphlink_common::utils::error::{Error, Result};
use graphlink_native::{NativeApi, NativeState, RawString, RawValue};
use tracing::{trace, warn};

use crate::handle::{NativeHandle, ValueHandle};

/// Operations every native value supports, whatever its type.
pub trait ValueExt<'a> {
    /// Returns the underlying handle.
    fn handle(&self) -> &ValueHandle<'a>;

    /// Unwraps the handle, dropping any cached reads.
    fn into_handle(self) -> ValueHandle<'a>
    where
        Self: Sized;

    /// Returns whether the native null flag is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the handle was released.
    fn is_null(&self) -> Result<bool> {
        let raw = self.handle().raw()?;
        Ok(self.handle().bridge().api().value_is_null(raw))
    }

    /// Sets or clears the native null flag and dispatches the value again.
    ///
    /// The wrapper is consumed: its variant and cached reads describe the
    /// value as it was, so the returned [`NativeValue`] replaces it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the handle was released, or any error
    /// raised while dispatching the updated value.
    fn set_null(self, is_null: bool) -> Result<NativeValue<'a>>
    where
        Self: Sized,
    {
        let raw = self.handle().raw()?;
        self.handle().bridge().api().value_set_null(raw, is_null);
        dispatch(self.into_handle())
    }

    /// Reads the declared type.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle was released or the native call fails.
    fn data_type(&self) -> Result<LogicalType> {
        let raw = self.handle().raw()?;
        self.handle().bridge().value_type(raw)
    }

    /// Renders the value in the engine's text format.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle was released or the native call fails.
    fn to_native_string(&self) -> Result<String> {
        let raw = self.handle().raw()?;
        self.handle()
            .bridge()
            .read_string("value_to_string", |api, out| api.value_to_string(raw, out))
    }

    /// Deep-copies the value into a new caller-owned native value.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle was released or the native call fails.
    fn clone_owned(&self) -> Result<NativeValue<'static>> {
        let raw = self.handle().raw()?;
        let bridge = self.handle().bridge();
        let mut out = RawValue::default();
        bridge.check(bridge.api().value_clone(raw, &mut out), "value_clone")?;
        dispatch(NativeHandle::from_raw(bridge, out))
    }

    /// Overwrites this value with a deep copy of `other` and dispatches it
    /// again.
    ///
    /// The copy may change the type and the null flag, so the wrapper is
    /// consumed and the returned [`NativeValue`] replaces it.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle was released or the native call fails.
    fn copy_from<'b>(self, other: &impl ValueExt<'b>) -> Result<NativeValue<'a>>
    where
        Self: Sized,
    {
        let raw = self.handle().raw()?;
        let source = other.handle().raw()?;
        let bridge = self.handle().bridge();
        bridge.check(bridge.api().value_copy(raw, source), "value_copy")?;
        dispatch(self.into_handle())
    }
}

/// A value whose type id this layer does not model (DECIMAL, UNION, ...).
///
/// Only the [`ValueExt`] operations are available.
pub struct AnyValue<'a> {
    handle: ValueHandle<'a>,
    ty: LogicalType,
}

impl AnyValue<'_> {
    /// Returns the declared type read at dispatch.
    pub fn logical_type(&self) -> &LogicalType {
        &self.ty
    }
}

/// A value with its null flag set.
pub struct NullValue<'a> {
    handle: ValueHandle<'a>,
    declared: LogicalType,
}

impl NullValue<'_> {
    /// Returns the type the engine declared for this null.
    pub fn declared_type(&self) -> &LogicalType {
        &self.declared
    }
}

/// Implements [`ValueExt`] and `Debug` for wrappers holding a `handle` field.
macro_rules! value_wrapper {
    ($($name:ident),* $(,)?) => {
        $(
            impl<'a> ValueExt<'a> for $name<'a> {
                fn handle(&self) -> &ValueHandle<'a> {
                    &self.handle
                }

                fn into_handle(self) -> ValueHandle<'a> {
                    self.handle
                }
            }

            impl fmt::Debug for $name<'_> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($name))
                        .field("handle", &self.handle)
                        .finish_non_exhaustive()
                }
            }
        )*
    };
}
pub(crate) use value_wrapper;

value_wrapper!(AnyValue, NullValue);

/// A native value, tagged by its runtime type.
#[derive(Debug)]
pub enum NativeValue<'a> {
    /// Unmodelled type.
    Any(AnyValue<'a>),
    /// Null of any declared type.
    Null(NullValue<'a>),
    /// BOOL
    Bool(BoolValue<'a>),
    /// INT8
    Int8(Int8Value<'a>),
    /// INT16
    Int16(Int16Value<'a>),
    /// INT32
    Int32(Int32Value<'a>),
    /// INT64
    Int64(Int64Value<'a>),
    /// UINT8
    UInt8(UInt8Value<'a>),
    /// UINT16
    UInt16(UInt16Value<'a>),
    /// UINT32
    UInt32(UInt32Value<'a>),
    /// UINT64
    UInt64(UInt64Value<'a>),
    /// INT128
    Int128(Int128Value<'a>),
    /// FLOAT
    Float(FloatValue<'a>),
    /// DOUBLE
    Double(DoubleValue<'a>),
    /// DATE
    Date(DateValue<'a>),
    /// TIMESTAMP (microseconds)
    Timestamp(TimestampValue<'a>),
    /// TIMESTAMP_SEC
    TimestampSec(TimestampValue<'a>),
    /// TIMESTAMP_MS
    TimestampMs(TimestampValue<'a>),
    /// TIMESTAMP_NS
    TimestampNs(TimestampValue<'a>),
    /// TIMESTAMP_TZ
    TimestampTz(TimestampValue<'a>),
    /// INTERVAL
    Interval(IntervalValue<'a>),
    /// INTERNAL_ID
    InternalId(InternalIdValue<'a>),
    /// STRING
    String(StringValue<'a>),
    /// BLOB
    Blob(BlobValue<'a>),
    /// UUID
    Uuid(UuidValue<'a>),
    /// LIST
    List(ListValue<'a>),
    /// ARRAY
    Array(ArrayValue<'a>),
    /// STRUCT
    Struct(StructValue<'a>),
    /// MAP
    Map(MapValue<'a>),
    /// NODE
    Node(NodeValue<'a>),
    /// REL
    Rel(RelValue<'a>),
    /// RECURSIVE_REL
    RecursiveRel(RecursiveRelValue<'a>),
}

/// Wraps `handle` in the variant matching its declared type.
pub(crate) fn dispatch(handle: ValueHandle<'_>) -> Result<NativeValue<'_>> {
    let raw = handle.raw()?;
    let ty = handle.bridge().value_type(raw)?;

    if handle.bridge().api().value_is_null(raw) {
        trace!(%ty, "dispatching null value");
        return Ok(NativeValue::Null(NullValue {
            handle,
            declared: ty,
        }));
    }

    let Some(tag) = ty.tag() else {
        return Ok(unmodelled(handle, ty));
    };
    trace!(%tag, "dispatching value");

    Ok(match tag {
        TypeTag::Any => unmodelled(handle, ty),
        TypeTag::Bool => NativeValue::Bool(BoolValue::new(handle)),
        TypeTag::Int8 => NativeValue::Int8(Int8Value::new(handle)),
        TypeTag::Int16 => NativeValue::Int16(Int16Value::new(handle)),
        TypeTag::Int32 => NativeValue::Int32(Int32Value::new(handle)),
        TypeTag::Int64 => NativeValue::Int64(Int64Value::new(handle)),
        TypeTag::UInt8 => NativeValue::UInt8(UInt8Value::new(handle)),
        TypeTag::UInt16 => NativeValue::UInt16(UInt16Value::new(handle)),
        TypeTag::UInt32 => NativeValue::UInt32(UInt32Value::new(handle)),
        TypeTag::UInt64 => NativeValue::UInt64(UInt64Value::new(handle)),
        TypeTag::Int128 => NativeValue::Int128(Int128Value::new(handle)),
        TypeTag::Float => NativeValue::Float(FloatValue::new(handle)),
        TypeTag::Double => NativeValue::Double(DoubleValue::new(handle)),
        TypeTag::Date => NativeValue::Date(DateValue::new(handle)?),
        TypeTag::Timestamp => NativeValue::Timestamp(TimestampValue::new(handle, tag)),
        TypeTag::TimestampSec => NativeValue::TimestampSec(TimestampValue::new(handle, tag)),
        TypeTag::TimestampMs => NativeValue::TimestampMs(TimestampValue::new(handle, tag)),
        TypeTag::TimestampNs => NativeValue::TimestampNs(TimestampValue::new(handle, tag)),
        TypeTag::TimestampTz => NativeValue::TimestampTz(TimestampValue::new(handle, tag)),
        TypeTag::Interval => NativeValue::Interval(IntervalValue::new(handle)),
        TypeTag::InternalId => NativeValue::InternalId(InternalIdValue::new(handle)),
        TypeTag::String => NativeValue::String(StringValue::new(handle)),
        TypeTag::Blob => NativeValue::Blob(BlobValue::new(handle)),
        TypeTag::Uuid => NativeValue::Uuid(UuidValue::new(handle)),
        TypeTag::List => NativeValue::List(ListValue::new(handle)),
        TypeTag::Array => NativeValue::Array(ArrayValue::new(handle, ty.array_size())),
        TypeTag::Struct => NativeValue::Struct(StructValue::new(handle)),
        TypeTag::Map => NativeValue::Map(MapValue::new(handle)),
        TypeTag::Node => NativeValue::Node(NodeValue::new(handle)),
        TypeTag::Rel => NativeValue::Rel(RelValue::new(handle)),
        TypeTag::RecursiveRel => NativeValue::RecursiveRel(RecursiveRelValue::new(handle)),
    })
}

fn unmodelled(handle: ValueHandle<'_>, ty: LogicalType) -> NativeValue<'_> {
    warn!(native_id = ty.native_id(), %ty, "unsupported native type, wrapping as Any");
    NativeValue::Any(AnyValue { handle, ty })
}

/// Dispatches an engine-owned child written by `call`. The child borrows
/// its parent.
pub(crate) fn child<'p>(
    parent: &'p ValueHandle<'_>,
    operation: &'static str,
    call: impl FnOnce(&dyn NativeApi, RawValue, &mut RawValue) -> NativeState,
) -> Result<NativeValue<'p>> {
    let raw = parent.raw()?;
    let bridge = parent.bridge();
    let mut out = RawValue::default();
    bridge.check(call(bridge.api(), raw, &mut out), operation)?;
    dispatch(NativeHandle::from_raw(bridge, out))
}

/// Returns the cached count, reading it on first use.
pub(crate) fn cached_count(cell: &OnceCell<u64>, read: impl FnOnce() -> Result<u64>) -> Result<u64> {
    if let Some(count) = cell.get() {
        return Ok(*count);
    }
    let count = read()?;
    Ok(*cell.get_or_init(|| count))
}

/// Fails with [`Error::OutOfRange`] unless `index < len`.
pub(crate) fn check_index(container: &'static str, index: u64, len: u64) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::OutOfRange {
            container,
            index,
            len,
        })
    }
}

/// Reads an engine string written by `call`.
pub(crate) fn read_text(
    handle: &ValueHandle<'_>,
    operation: &'static str,
    call: impl FnOnce(&dyn NativeApi, RawValue, &mut RawString) -> NativeState,
) -> Result<String> {
    let raw = handle.raw()?;
    handle.bridge().read_string(operation, |api, out| call(api, raw, out))
}

macro_rules! each_variant {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            NativeValue::Any($inner) => $body,
            NativeValue::Null($inner) => $body,
            NativeValue::Bool($inner) => $body,
            NativeValue::Int8($inner) => $body,
            NativeValue::Int16($inner) => $body,
            NativeValue::Int32($inner) => $body,
            NativeValue::Int64($inner) => $body,
            NativeValue::UInt8($inner) => $body,
            NativeValue::UInt16($inner) => $body,
            NativeValue::UInt32($inner) => $body,
            NativeValue::UInt64($inner) => $body,
            NativeValue::Int128($inner) => $body,
            NativeValue::Float($inner) => $body,
            NativeValue::Double($inner) => $body,
            NativeValue::Date($inner) => $body,
            NativeValue::Timestamp($inner)
            | NativeValue::TimestampSec($inner)
            | NativeValue::TimestampMs($inner)
            | NativeValue::TimestampNs($inner)
            | NativeValue::TimestampTz($inner) => $body,
            NativeValue::Interval($inner) => $body,
            NativeValue::InternalId($inner) => $body,
            NativeValue::String($inner) => $body,
            NativeValue::Blob($inner) => $body,
            NativeValue::Uuid($inner) => $body,
            NativeValue::List($inner) => $body,
            NativeValue::Array($inner) => $body,
            NativeValue::Struct($inner) => $body,
            NativeValue::Map($inner) => $body,
            NativeValue::Node($inner) => $body,
            NativeValue::Rel($inner) => $body,
            NativeValue::RecursiveRel($inner) => $body,
        }
    };
}

impl<'a> ValueExt<'a> for NativeValue<'a> {
    fn handle(&self) -> &ValueHandle<'a> {
        each_variant!(self, v => v.handle())
    }

    fn into_handle(self) -> ValueHandle<'a> {
        each_variant!(self, v => v.into_handle())
    }
}

impl<'a> NativeValue<'a> {
    /// Returns the tag this value was dispatched on.
    ///
    /// Nulls and unmodelled types report [`TypeTag::Any`].
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Any(_) | Self::Null(_) => TypeTag::Any,
            Self::Bool(_) => TypeTag::Bool,
            Self::Int8(_) => TypeTag::Int8,
            Self::Int16(_) => TypeTag::Int16,
            Self::Int32(_) => TypeTag::Int32,
            Self::Int64(_) => TypeTag::Int64,
            Self::UInt8(_) => TypeTag::UInt8,
            Self::UInt16(_) => TypeTag::UInt16,
            Self::UInt32(_) => TypeTag::UInt32,
            Self::UInt64(_) => TypeTag::UInt64,
            Self::Int128(_) => TypeTag::Int128,
            Self::Float(_) => TypeTag::Float,
            Self::Double(_) => TypeTag::Double,
            Self::Date(_) => TypeTag::Date,
            Self::Timestamp(_) => TypeTag::Timestamp,
            Self::TimestampSec(_) => TypeTag::TimestampSec,
            Self::TimestampMs(_) => TypeTag::TimestampMs,
            Self::TimestampNs(_) => TypeTag::TimestampNs,
            Self::TimestampTz(_) => TypeTag::TimestampTz,
            Self::Interval(_) => TypeTag::Interval,
            Self::InternalId(_) => TypeTag::InternalId,
            Self::String(_) => TypeTag::String,
            Self::Blob(_) => TypeTag::Blob,
            Self::Uuid(_) => TypeTag::Uuid,
            Self::List(_) => TypeTag::List,
            Self::Array(_) => TypeTag::Array,
            Self::Struct(_) => TypeTag::Struct,
            Self::Map(_) => TypeTag::Map,
            Self::Node(_) => TypeTag::Node,
            Self::Rel(_) => TypeTag::Rel,
            Self::RecursiveRel(_) => TypeTag::RecursiveRel,
        }
    }

    /// Returns true if the value was dispatched as null.
    pub fn is_null_variant(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// Recursively copies the native value into an owned [`Value`].
    ///
    /// This walks the whole tree and issues one native call per scalar, so it
    /// is meant for explicit snapshots rather than hot paths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] for unmodelled types, or any error raised
    /// while reading the tree.
    pub fn to_value(&self) -> Result<Value> {
        Ok(match self {
            Self::Any(v) => {
                return Err(Error::Conversion(format!(
                    "cannot snapshot a value of type {}",
                    v.ty
                )));
            }
            Self::Null(_) => Value::Null,
            Self::Bool(v) => Value::Bool(v.value()?),
            Self::Int8(v) => Value::Int8(v.value()?),
            Self::Int16(v) => Value::Int16(v.value()?),
            Self::Int32(v) => Value::Int32(v.value()?),
            Self::Int64(v) => Value::Int64(v.value()?),
            Self::UInt8(v) => Value::UInt8(v.value()?),
            Self::UInt16(v) => Value::UInt16(v.value()?),
            Self::UInt32(v) => Value::UInt32(v.value()?),
            Self::UInt64(v) => Value::UInt64(v.value()?),
            Self::Int128(v) => Value::Int128(v.value()?),
            Self::Float(v) => Value::Float(v.value()?),
            Self::Double(v) => Value::Double(v.value()?),
            Self::Date(v) => Value::Date(v.value()),
            Self::Timestamp(v)
            | Self::TimestampSec(v)
            | Self::TimestampMs(v)
            | Self::TimestampNs(v)
            | Self::TimestampTz(v) => Value::Timestamp(v.value()?),
            Self::Interval(v) => Value::Interval(v.value()?),
            Self::InternalId(v) => Value::InternalId(v.value()?),
            Self::String(v) => Value::String(v.value()?),
            Self::Blob(v) => Value::Blob(v.value()?),
            Self::Uuid(v) => Value::Uuid(v.value()?),
            Self::List(v) => Value::List(snapshot_all(v.iter())?),
            Self::Array(v) => Value::Array(snapshot_all(v.iter())?),
            Self::Struct(v) => Value::Struct(
                v.fields()?
                    .into_iter()
                    .map(|(name, field)| Ok((name, field.to_value()?)))
                    .collect::<Result<_>>()?,
            ),
            Self::Map(v) => Value::Map(
                v.entries()?
                    .into_iter()
                    .map(|(key, value)| Ok((key.to_value()?, value.to_value()?)))
                    .collect::<Result<_>>()?,
            ),
            Self::Node(v) => Value::Node(v.snapshot()?),
            Self::Rel(v) => Value::Rel(v.snapshot()?),
            Self::RecursiveRel(v) => {
                let (nodes, rels) = v.path()?;
                Value::RecursiveRel {
                    nodes: snapshot_all(nodes.iter())?,
                    rels: snapshot_all(rels.iter())?,
                }
            }
        })
    }

    /// Returns the node wrapper, if this is a node.
    pub fn as_node(&self) -> Option<&NodeValue<'a>> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the relationship wrapper, if this is a relationship.
    pub fn as_rel(&self) -> Option<&RelValue<'a>> {
        match self {
            Self::Rel(rel) => Some(rel),
            _ => None,
        }
    }

    /// Returns the list wrapper, if this is a list.
    pub fn as_list(&self) -> Option<&ListValue<'a>> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    /// Returns the string wrapper, if this is a string.
    pub fn as_string(&self) -> Option<&StringValue<'a>> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

fn snapshot_all<'v>(items: impl Iterator<Item = Result<NativeValue<'v>>>) -> Result<Vec<Value>> {
    items.map(|item| item?.to_value()).collect()
}

pub(crate) fn snapshot_properties(
    properties: Vec<(String, NativeValue<'_>)>,
) -> Result<Vec<(String, Value)>> {
    properties
        .into_iter()
        .map(|(name, value)| Ok((name, value.to_value()?)))
        .collect()
}
