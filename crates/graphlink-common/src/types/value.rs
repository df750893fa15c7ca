//! Owned values.
//!
//! [`Value`] is the managed-side mirror of every native variant. It is what
//! callers hand in as prepared-statement parameters and what they get back
//! when they explicitly snapshot a native value. Native wrappers never build
//! one on their own; traversal of native data stays lazy.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{Date, InternalId, Interval, Timestamp, TypeTag};

/// An owned, dynamically typed value.
///
/// # Examples
///
/// ```
/// use graphlink_common::types::{TypeTag, Value};
///
/// let name = Value::from("Alice");
/// let age = Value::from(30i64);
///
/// assert_eq!(name.as_str(), Some("Alice"));
/// assert_eq!(age.as_int64(), Some(30));
/// assert_eq!(age.tag(), TypeTag::Int64);
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null/missing value
    Null,
    /// Boolean value
    Bool(bool),
    /// 8-bit signed integer
    Int8(i8),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 8-bit unsigned integer
    UInt8(u8),
    /// 16-bit unsigned integer
    UInt16(u16),
    /// 32-bit unsigned integer
    UInt32(u32),
    /// 64-bit unsigned integer
    UInt64(u64),
    /// 128-bit signed integer
    Int128(i128),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// Calendar date
    Date(Date),
    /// Timestamp in one of five resolutions
    Timestamp(Timestamp),
    /// Months/days/micros interval
    Interval(Interval),
    /// Internal element id
    InternalId(InternalId),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Blob(Vec<u8>),
    /// UUID
    Uuid(Uuid),
    /// Variable-length list
    List(Vec<Value>),
    /// Fixed-length array
    Array(Vec<Value>),
    /// Struct fields in declaration order
    Struct(Vec<(String, Value)>),
    /// Map entries in engine order; duplicate keys are kept
    Map(Vec<(Value, Value)>),
    /// Graph node
    Node(NodeSnapshot),
    /// Graph relationship
    Rel(RelSnapshot),
    /// Variable-length path
    RecursiveRel {
        /// Nodes along the path
        nodes: Vec<Value>,
        /// Relationships along the path
        rels: Vec<Value>,
    },
}

impl Value {
    /// Returns the native tag this value maps to.
    ///
    /// `Null` has no type of its own and reports [`TypeTag::Any`].
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Any,
            Value::Bool(_) => TypeTag::Bool,
            Value::Int8(_) => TypeTag::Int8,
            Value::Int16(_) => TypeTag::Int16,
            Value::Int32(_) => TypeTag::Int32,
            Value::Int64(_) => TypeTag::Int64,
            Value::UInt8(_) => TypeTag::UInt8,
            Value::UInt16(_) => TypeTag::UInt16,
            Value::UInt32(_) => TypeTag::UInt32,
            Value::UInt64(_) => TypeTag::UInt64,
            Value::Int128(_) => TypeTag::Int128,
            Value::Float(_) => TypeTag::Float,
            Value::Double(_) => TypeTag::Double,
            Value::Date(_) => TypeTag::Date,
            Value::Timestamp(ts) => ts.unit().tag(),
            Value::Interval(_) => TypeTag::Interval,
            Value::InternalId(_) => TypeTag::InternalId,
            Value::String(_) => TypeTag::String,
            Value::Blob(_) => TypeTag::Blob,
            Value::Uuid(_) => TypeTag::Uuid,
            Value::List(_) => TypeTag::List,
            Value::Array(_) => TypeTag::Array,
            Value::Struct(_) => TypeTag::Struct,
            Value::Map(_) => TypeTag::Map,
            Value::Node(_) => TypeTag::Node,
            Value::Rel(_) => TypeTag::Rel,
            Value::RecursiveRel { .. } => TypeTag::RecursiveRel,
        }
    }

    /// Returns true if this value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean value, if this is a Bool.
    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer value widened to i64, for any signed integer up to 64 bits.
    #[must_use]
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float value widened to f64.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value, if this is a String.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bytes, if this is a Blob.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the elements, if this is a List or Array.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the node, if this is a Node.
    #[must_use]
    pub fn as_node(&self) -> Option<&NodeSnapshot> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the relationship, if this is a Rel.
    #[must_use]
    pub fn as_rel(&self) -> Option<&RelSnapshot> {
        match self {
            Value::Rel(rel) => Some(rel),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int8(v) => write!(f, "Int8({v})"),
            Value::Int16(v) => write!(f, "Int16({v})"),
            Value::Int32(v) => write!(f, "Int32({v})"),
            Value::Int64(v) => write!(f, "Int64({v})"),
            Value::UInt8(v) => write!(f, "UInt8({v})"),
            Value::UInt16(v) => write!(f, "UInt16({v})"),
            Value::UInt32(v) => write!(f, "UInt32({v})"),
            Value::UInt64(v) => write!(f, "UInt64({v})"),
            Value::Int128(v) => write!(f, "Int128({v})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Double(v) => write!(f, "Double({v})"),
            Value::Date(d) => write!(f, "Date({d})"),
            Value::Timestamp(ts) => write!(f, "Timestamp({ts})"),
            Value::Interval(i) => write!(f, "Interval({i})"),
            Value::InternalId(id) => write!(f, "InternalId({id})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Blob(b) => write!(f, "Blob([{} bytes])", b.len()),
            Value::Uuid(u) => write!(f, "Uuid({u})"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Struct(fields) => f.debug_tuple("Struct").field(fields).finish(),
            Value::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Value::Node(node) => write!(f, "{node:?}"),
            Value::Rel(rel) => write!(f, "{rel:?}"),
            Value::RecursiveRel { nodes, rels } => f
                .debug_struct("RecursiveRel")
                .field("nodes", nodes)
                .field("rels", rels)
                .finish(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int32(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<i128> for Value {
    fn from(i: i128) -> Self {
        Value::Int128(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Blob(b)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<Date> for Value {
    fn from(d: Date) -> Self {
        Value::Date(d)
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Interval> for Value {
    fn from(i: Interval) -> Self {
        Value::Interval(i)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// An owned copy of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Internal id.
    pub id: InternalId,
    /// Label (table name).
    pub label: String,
    /// Properties in declaration order.
    pub properties: Vec<(String, Value)>,
}

impl NodeSnapshot {
    /// Looks up a property by case-insensitive name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        find_property(&self.properties, name)
    }
}

/// An owned copy of a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelSnapshot {
    /// Internal id.
    pub id: InternalId,
    /// Source node id.
    pub src: InternalId,
    /// Destination node id.
    pub dst: InternalId,
    /// Label (relationship table name).
    pub label: String,
    /// Properties in declaration order.
    pub properties: Vec<(String, Value)>,
}

impl RelSnapshot {
    /// Looks up a property by case-insensitive name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        find_property(&self.properties, name)
    }
}

fn find_property<'a>(properties: &'a [(String, Value)], name: &str) -> Option<&'a Value> {
    properties
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimestampUnit;

    #[test]
    fn test_tags() {
        assert_eq!(Value::Null.tag(), TypeTag::Any);
        assert_eq!(Value::from(1i32).tag(), TypeTag::Int32);
        assert_eq!(
            Value::Timestamp(Timestamp::new(1, TimestampUnit::Nanos)).tag(),
            TypeTag::TimestampNs
        );
        assert_eq!(Value::Map(vec![]).tag(), TypeTag::Map);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int16(-4).as_int64(), Some(-4));
        assert_eq!(Value::Float(1.5).as_double(), Some(1.5));
        assert_eq!(Value::from(vec![1u8, 2]).as_bytes(), Some(&[1u8, 2][..]));
        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::Bool(true).as_str(), None);
    }

    #[test]
    fn test_node_property_lookup_is_case_insensitive() {
        let node = NodeSnapshot {
            id: InternalId::new(0, 1),
            label: "Person".into(),
            properties: vec![("Name".into(), Value::from("Alice"))],
        };
        assert_eq!(node.property("name"), Some(&Value::from("Alice")));
        assert_eq!(node.property("age"), None);
    }
}
