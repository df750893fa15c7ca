//! Fixed-width scalar wrappers.

use std::fmt;

use graphlink_common::types::{InternalId, TypeTag};
use graphlink_common::utils::error::Result;
use graphlink_native::{NativeApi, NativeInt128, NativeInternalId, NativeState, RawValue};

use super::{ValueExt, value_wrapper};
use crate::handle::ValueHandle;

/// One typed native read. On failure, reports a type mismatch if the value's
/// actual tag differs from `expected`.
pub(super) fn read_typed<T: Default>(
    handle: &ValueHandle<'_>,
    operation: &'static str,
    expected: TypeTag,
    get: impl FnOnce(&dyn NativeApi, RawValue, &mut T) -> NativeState,
) -> Result<T> {
    let raw = handle.raw()?;
    let bridge = handle.bridge();
    let mut out = T::default();
    let state = get(bridge.api(), raw, &mut out);
    bridge.check_typed(state, operation, raw, expected)?;
    Ok(out)
}

macro_rules! scalar_value {
    ($($(#[$doc:meta])* $name:ident($tag:ident) -> $ty:ty = $get:ident;)*) => {
        $(
            $(#[$doc])*
            pub struct $name<'a> {
                handle: ValueHandle<'a>,
            }

            impl<'a> $name<'a> {
                pub(crate) fn new(handle: ValueHandle<'a>) -> Self {
                    Self { handle }
                }

                /// Reads the value.
                ///
                /// # Errors
                ///
                /// Returns [`Error::TypeMismatch`](graphlink_common::Error::TypeMismatch)
                /// if the native value is of another type, or a native error.
                pub fn value(&self) -> Result<$ty> {
                    read_typed(&self.handle, stringify!($get), TypeTag::$tag, |api, raw, out| {
                        api.$get(raw, out)
                    })
                }
            }

            value_wrapper!($name);
        )*
    };
}

scalar_value! {
    /// A native BOOL.
    BoolValue(Bool) -> bool = value_get_bool;
    /// A native INT8.
    Int8Value(Int8) -> i8 = value_get_int8;
    /// A native INT16.
    Int16Value(Int16) -> i16 = value_get_int16;
    /// A native INT32.
    Int32Value(Int32) -> i32 = value_get_int32;
    /// A native INT64.
    Int64Value(Int64) -> i64 = value_get_int64;
    /// A native UINT8.
    UInt8Value(UInt8) -> u8 = value_get_uint8;
    /// A native UINT16.
    UInt16Value(UInt16) -> u16 = value_get_uint16;
    /// A native UINT32.
    UInt32Value(UInt32) -> u32 = value_get_uint32;
    /// A native UINT64.
    UInt64Value(UInt64) -> u64 = value_get_uint64;
    /// A native FLOAT.
    FloatValue(Float) -> f32 = value_get_float;
    /// A native DOUBLE.
    DoubleValue(Double) -> f64 = value_get_double;
}

/// A native INT128, read as two 64-bit halves.
pub struct Int128Value<'a> {
    handle: ValueHandle<'a>,
}

impl<'a> Int128Value<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>) -> Self {
        Self { handle }
    }

    /// Reads the value.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch or native error.
    pub fn value(&self) -> Result<i128> {
        read_typed(
            &self.handle,
            "value_get_int128",
            TypeTag::Int128,
            |api, raw, out: &mut NativeInt128| api.value_get_int128(raw, out),
        )
        .map(NativeInt128::to_i128)
    }
}

/// A native INTERNAL_ID.
pub struct InternalIdValue<'a> {
    handle: ValueHandle<'a>,
}

impl<'a> InternalIdValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>) -> Self {
        Self { handle }
    }

    /// Reads the id.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch or native error.
    pub fn value(&self) -> Result<InternalId> {
        read_internal_id(&self.handle)
    }
}

pub(super) fn read_internal_id(handle: &ValueHandle<'_>) -> Result<InternalId> {
    read_typed(
        handle,
        "value_get_internal_id",
        TypeTag::InternalId,
        |api, raw, out: &mut NativeInternalId| api.value_get_internal_id(raw, out),
    )
    .map(|id| InternalId::new(id.table_id, id.offset))
}

value_wrapper!(Int128Value, InternalIdValue);
