//! Core type definitions for Graphlink.
//!
//! - Type tags ([`TypeTag`]) and declared types ([`LogicalType`])
//! - Identifier types ([`InternalId`])
//! - Temporal types ([`Date`], [`Timestamp`], [`Interval`])
//! - The owned value model ([`Value`])

mod id;
mod logical_type;
mod tag;
mod temporal;
mod value;

pub use id::InternalId;
pub use logical_type::LogicalType;
pub use tag::TypeTag;
pub use temporal::{Date, Interval, Timestamp, TimestampUnit};
pub use value::{NodeSnapshot, RelSnapshot, Value};
