//! Native value type tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of native type tags the boundary layer understands.
///
/// Discriminants are the engine's numeric type ids. Ids the engine may report
/// that are not listed here (decimal, union, serial, ...) are handled by the
/// dispatcher's `Any` fallback rather than by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum TypeTag {
    /// Untyped / unknown.
    Any = 0,
    /// Graph node.
    Node = 10,
    /// Graph relationship.
    Rel = 11,
    /// Variable-length path.
    RecursiveRel = 12,
    /// Boolean.
    Bool = 22,
    /// Signed 64-bit integer.
    Int64 = 23,
    /// Signed 32-bit integer.
    Int32 = 24,
    /// Signed 16-bit integer.
    Int16 = 25,
    /// Signed 8-bit integer.
    Int8 = 26,
    /// Unsigned 64-bit integer.
    UInt64 = 27,
    /// Unsigned 32-bit integer.
    UInt32 = 28,
    /// Unsigned 16-bit integer.
    UInt16 = 29,
    /// Unsigned 8-bit integer.
    UInt8 = 30,
    /// Signed 128-bit integer.
    Int128 = 31,
    /// 64-bit float.
    Double = 32,
    /// 32-bit float.
    Float = 33,
    /// Days since the Unix epoch.
    Date = 34,
    /// Microseconds since the Unix epoch.
    Timestamp = 35,
    /// Seconds since the Unix epoch.
    TimestampSec = 36,
    /// Milliseconds since the Unix epoch.
    TimestampMs = 37,
    /// Nanoseconds since the Unix epoch.
    TimestampNs = 38,
    /// Microseconds since the Unix epoch, UTC normalized.
    TimestampTz = 39,
    /// Months, days and microseconds.
    Interval = 40,
    /// Table id and row offset.
    InternalId = 42,
    /// UTF-8 string.
    String = 50,
    /// Binary blob.
    Blob = 51,
    /// Variable-length list.
    List = 52,
    /// Fixed-length array.
    Array = 53,
    /// Struct with named fields.
    Struct = 54,
    /// Key/value map.
    Map = 55,
    /// 128-bit UUID.
    Uuid = 59,
}

impl TypeTag {
    /// Every tag, in declaration order.
    pub const ALL: [TypeTag; 31] = [
        Self::Any,
        Self::Node,
        Self::Rel,
        Self::RecursiveRel,
        Self::Bool,
        Self::Int64,
        Self::Int32,
        Self::Int16,
        Self::Int8,
        Self::UInt64,
        Self::UInt32,
        Self::UInt16,
        Self::UInt8,
        Self::Int128,
        Self::Double,
        Self::Float,
        Self::Date,
        Self::Timestamp,
        Self::TimestampSec,
        Self::TimestampMs,
        Self::TimestampNs,
        Self::TimestampTz,
        Self::Interval,
        Self::InternalId,
        Self::String,
        Self::Blob,
        Self::List,
        Self::Array,
        Self::Struct,
        Self::Map,
        Self::Uuid,
    ];

    /// Maps a native type id to a tag, or `None` for ids this layer does not model.
    #[must_use]
    pub const fn from_native_id(id: u32) -> Option<Self> {
        Some(match id {
            0 => Self::Any,
            10 => Self::Node,
            11 => Self::Rel,
            12 => Self::RecursiveRel,
            22 => Self::Bool,
            23 => Self::Int64,
            24 => Self::Int32,
            25 => Self::Int16,
            26 => Self::Int8,
            27 => Self::UInt64,
            28 => Self::UInt32,
            29 => Self::UInt16,
            30 => Self::UInt8,
            31 => Self::Int128,
            32 => Self::Double,
            33 => Self::Float,
            34 => Self::Date,
            35 => Self::Timestamp,
            36 => Self::TimestampSec,
            37 => Self::TimestampMs,
            38 => Self::TimestampNs,
            39 => Self::TimestampTz,
            40 => Self::Interval,
            42 => Self::InternalId,
            50 => Self::String,
            51 => Self::Blob,
            52 => Self::List,
            53 => Self::Array,
            54 => Self::Struct,
            55 => Self::Map,
            59 => Self::Uuid,
            _ => return None,
        })
    }

    /// Returns the native type id.
    #[inline]
    #[must_use]
    pub const fn native_id(self) -> u32 {
        self as u32
    }

    /// Returns the engine's name for this type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Any => "ANY",
            Self::Node => "NODE",
            Self::Rel => "REL",
            Self::RecursiveRel => "RECURSIVE_REL",
            Self::Bool => "BOOL",
            Self::Int64 => "INT64",
            Self::Int32 => "INT32",
            Self::Int16 => "INT16",
            Self::Int8 => "INT8",
            Self::UInt64 => "UINT64",
            Self::UInt32 => "UINT32",
            Self::UInt16 => "UINT16",
            Self::UInt8 => "UINT8",
            Self::Int128 => "INT128",
            Self::Double => "DOUBLE",
            Self::Float => "FLOAT",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::TimestampSec => "TIMESTAMP_SEC",
            Self::TimestampMs => "TIMESTAMP_MS",
            Self::TimestampNs => "TIMESTAMP_NS",
            Self::TimestampTz => "TIMESTAMP_TZ",
            Self::Interval => "INTERVAL",
            Self::InternalId => "INTERNAL_ID",
            Self::String => "STRING",
            Self::Blob => "BLOB",
            Self::List => "LIST",
            Self::Array => "ARRAY",
            Self::Struct => "STRUCT",
            Self::Map => "MAP",
            Self::Uuid => "UUID",
        }
    }

    /// Returns true for tags whose values hold child values.
    #[must_use]
    pub const fn is_composite(self) -> bool {
        matches!(
            self,
            Self::List
                | Self::Array
                | Self::Struct
                | Self::Map
                | Self::Node
                | Self::Rel
                | Self::RecursiveRel
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_id_roundtrip() {
        for tag in TypeTag::ALL {
            assert_eq!(TypeTag::from_native_id(tag.native_id()), Some(tag));
        }
    }

    #[test]
    fn test_unmodelled_ids() {
        // decimal, serial, union
        assert_eq!(TypeTag::from_native_id(41), None);
        assert_eq!(TypeTag::from_native_id(13), None);
        assert_eq!(TypeTag::from_native_id(56), None);
    }

    #[test]
    fn test_composite() {
        assert!(TypeTag::List.is_composite());
        assert!(TypeTag::RecursiveRel.is_composite());
        assert!(!TypeTag::Blob.is_composite());
    }
}
