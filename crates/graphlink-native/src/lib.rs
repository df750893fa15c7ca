//! # graphlink-native
//!
//! The foreign contract of the native graph engine.
//!
//! [`NativeApi`] lists the engine's C entry points one-to-one: opaque
//! descriptors go in, a [`NativeState`] status and out-parameters come back.
//! Nothing in this crate tracks lifetimes or ownership on the caller's
//! behalf; that is the job of `graphlink-core`.
//!
//! ## Modules
//!
//! - [`raw`] - Opaque descriptors and plain-data structs crossing the boundary
//! - [`api`] - The [`NativeApi`] trait
//! - [`memory`] - [`MemoryEngine`], an instrumented in-process engine

#![warn(missing_docs)]

pub mod api;
pub mod memory;
pub mod raw;

pub use api::NativeApi;
pub use memory::{CallStats, MemoryEngine, ResultSet, StatsSnapshot};
pub use raw::{
    NativeDate, NativeInt128, NativeInternalId, NativeInterval, NativeQuerySummary, NativeState,
    NativeTimestamp, RawFlatTuple, RawLogicalType, RawPtr, RawQueryResult, RawString, RawValue,
};
