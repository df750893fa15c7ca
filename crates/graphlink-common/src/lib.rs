//! # graphlink-common
//!
//! Foundation layer for Graphlink: types, errors and the owned value model.
//!
//! This crate provides the vocabulary shared by the native contract and the
//! boundary layer. It has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Type tags, internal ids, temporal types, logical types, [`Value`]
//! - [`utils`] - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use types::{
    Date, InternalId, Interval, LogicalType, NodeSnapshot, RelSnapshot, Timestamp, TimestampUnit,
    TypeTag, Value,
};
pub use utils::error::{Error, ErrorKind, NativeError, Result};
