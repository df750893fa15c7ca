//! Opaque descriptors and plain-data structs.
//!
//! Descriptors are `Copy` addresses. Copying one never duplicates the native
//! object it points at, and holding one keeps nothing alive.

use std::fmt;

/// An opaque native address. Zero is the null pointer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawPtr(usize);

impl RawPtr {
    /// The null pointer.
    pub const NULL: Self = Self(0);

    /// Wraps a raw address.
    #[inline]
    #[must_use]
    pub const fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    /// Returns the raw address.
    #[inline]
    #[must_use]
    pub const fn addr(self) -> usize {
        self.0
    }

    /// Returns true for the null pointer.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for RawPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Status code returned by fallible native calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NativeState {
    /// The call succeeded and its out-parameters are written.
    Success = 0,
    /// The call failed; the engine's last error explains why.
    Error = 1,
}

impl NativeState {
    /// Returns true for [`NativeState::Success`].
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// A native value descriptor.
///
/// `owned_by_engine` is set on values the engine hands out as views into
/// another object (list elements, struct fields, tuple cells). The engine
/// destroys those together with their parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawValue {
    /// Address of the value.
    pub ptr: RawPtr,
    /// Whether the engine, not the caller, owns the value's memory.
    pub owned_by_engine: bool,
}

impl RawValue {
    /// A caller-owned value at `ptr`.
    #[must_use]
    pub const fn owned(ptr: RawPtr) -> Self {
        Self {
            ptr,
            owned_by_engine: false,
        }
    }

    /// An engine-owned value at `ptr`.
    #[must_use]
    pub const fn borrowed(ptr: RawPtr) -> Self {
        Self {
            ptr,
            owned_by_engine: true,
        }
    }
}

/// A native logical type descriptor. Always caller-owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawLogicalType {
    /// Address of the type.
    pub ptr: RawPtr,
}

/// A native query result descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawQueryResult {
    /// Address of the result.
    pub ptr: RawPtr,
    /// Whether the engine, not the caller, owns the result.
    pub owned_by_engine: bool,
}

/// A native row descriptor.
///
/// Every `query_result_get_next` hands out a fresh descriptor the caller must
/// destroy. All descriptors of one result share the engine's single row
/// buffer, which the next `get_next` overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawFlatTuple {
    /// Address of the row descriptor.
    pub ptr: RawPtr,
    /// Whether the engine, not the caller, owns the descriptor.
    pub owned_by_engine: bool,
}

/// A string buffer allocated by the engine. Freed with `destroy_string`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawString {
    /// Address of the buffer.
    pub ptr: RawPtr,
}

/// A 128-bit integer split into halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeInt128 {
    /// Low 64 bits.
    pub low: u64,
    /// High 64 bits, carrying the sign.
    pub high: i64,
}

impl NativeInt128 {
    /// Splits an `i128`.
    #[must_use]
    pub const fn from_i128(value: i128) -> Self {
        Self {
            low: value as u64,
            high: (value >> 64) as i64,
        }
    }

    /// Joins the halves.
    #[must_use]
    pub const fn to_i128(self) -> i128 {
        ((self.high as i128) << 64) | self.low as i128
    }
}

/// Days since 1970-01-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeDate {
    /// Day count.
    pub days: i32,
}

/// A timestamp count; the unit depends on the entry point that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeTimestamp {
    /// Units since the epoch.
    pub value: i64,
}

/// A months/days/micros interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeInterval {
    /// Months.
    pub months: i32,
    /// Days.
    pub days: i32,
    /// Microseconds.
    pub micros: i64,
}

/// A table id and row offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeInternalId {
    /// Table id.
    pub table_id: u64,
    /// Row offset.
    pub offset: u64,
}

/// Timings reported for a finished query.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NativeQuerySummary {
    /// Compilation time in milliseconds.
    pub compiling_ms: f64,
    /// Execution time in milliseconds.
    pub execution_ms: f64,
}
