//! # graphlink-core
//!
//! The managed side of the native boundary: handle lifetimes, background
//! release, typed value wrappers, query cursors and parameter marshaling.
//!
//! Start with a [`Bridge`]. It owns the native API and the release worker,
//! and everything else is reached through it.
//!
//! ## Modules
//!
//! - [`bridge`] - [`Bridge`], the shared context every handle points back to
//! - [`config`] - [`BridgeConfig`]
//! - [`handle`] - [`NativeHandle`], exclusive ownership of one native pointer
//! - [`release`] - The single-worker release queue
//! - [`value`] - [`NativeValue`] and the per-type wrappers
//! - [`cursor`] - [`QueryResultCursor`]
//! - [`row`] - [`Row`]
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use graphlink_common::types::{TypeTag, Value};
//! use graphlink_core::{Bridge, ValueExt};
//! use graphlink_native::{MemoryEngine, ResultSet};
//!
//! let engine = Arc::new(MemoryEngine::new());
//! let bridge = Bridge::new(engine.clone())?;
//!
//! let mut cursor = bridge.open_cursor(engine.open_result(
//!     ResultSet::new()
//!         .column("age", TypeTag::Int64)
//!         .row(vec![Value::Int64(30)]),
//! ))?;
//! let row = cursor.next()?;
//! let age = row.get(0)?;
//! assert!(!age.is_null()?);
//! assert_eq!(age.to_value()?, Value::Int64(30));
//! # Ok::<(), graphlink_common::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bridge;
pub mod config;
pub mod cursor;
pub mod handle;
mod marshal;
pub mod release;
pub mod row;
pub mod value;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use cursor::{CursorState, OwnedRows, QueryResultCursor, QuerySummary};
pub use handle::{NativeHandle, Ownership, RawResource, ValueHandle};
pub use release::{Resource, ResourceKind};
pub use row::Row;
pub use value::{
    AnyValue, ArrayValue, BlobValue, BoolValue, DateValue, DoubleValue, FloatValue, Int8Value,
    Int16Value, Int32Value, Int64Value, Int128Value, InternalIdValue, IntervalValue, ListIter,
    ListValue, MapValue, NativeValue, NodeValue, NullValue, PropertyIndex, RecursiveRelValue,
    RelValue, StringValue, StructValue, TimestampValue, UInt8Value, UInt16Value, UInt32Value,
    UInt64Value, UuidValue, ValueExt,
};
