//! # Graphlink
//!
//! A memory-safe layer over an embedded native graph engine.
//!
//! The engine speaks in opaque pointers and out-parameters. Graphlink wraps
//! each pointer in a handle that is released exactly once, on a single
//! background worker, and turns native values into typed wrappers that read
//! lazily from engine memory.
//!
//! If you're new here, start with [`Bridge`]: hand it a [`NativeApi`]
//! implementation and everything else hangs off it.
//!
//! ## Crates
//!
//! | Crate | What it holds |
//! | ----- | ------------- |
//! | `graphlink-common` | [`Value`], [`TypeTag`], [`LogicalType`], [`Error`] |
//! | `graphlink-native` | [`NativeApi`] and the in-process [`MemoryEngine`] |
//! | `graphlink-core` | [`Bridge`], handles, value wrappers, cursors |
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use graphlink::{Bridge, MemoryEngine, ResultSet, TypeTag, Value};
//!
//! let engine = Arc::new(MemoryEngine::new());
//! let bridge = Bridge::new(engine.clone())?;
//!
//! // Parameters go in as owned values
//! let param = bridge.create_value(&Value::from("Alice"))?;
//! assert_eq!(param.to_value()?, Value::from("Alice"));
//!
//! // Results come back through a cursor
//! let mut cursor = bridge.open_cursor(engine.open_result(
//!     ResultSet::new()
//!         .column("name", TypeTag::String)
//!         .row(vec![Value::from("Alice")]),
//! ))?;
//! while let Some(row) = cursor.try_next()? {
//!     println!("{}", row.to_native_string()?);
//! }
//! # Ok::<(), graphlink::Error>(())
//! ```

// Re-export the boundary layer
pub use graphlink_core::{
    Bridge, BridgeConfig, CursorState, NativeHandle, NativeValue, Ownership, QueryResultCursor,
    QuerySummary, Row, ValueExt,
};

// Re-export the native contract
pub use graphlink_native::{MemoryEngine, NativeApi, ResultSet};

// Re-export core types - you'll need these for parameters and snapshots
pub use graphlink_common::types::{
    Date, InternalId, Interval, LogicalType, NodeSnapshot, RelSnapshot, Timestamp, TimestampUnit,
    TypeTag, Value,
};
pub use graphlink_common::{Error, ErrorKind, Result};

/// Value wrappers, one per native type.
pub mod value {
    pub use graphlink_core::value::*;
}
