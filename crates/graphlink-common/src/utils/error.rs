//! Error types for Graphlink.
//!
//! Every failure surfaced by the boundary layer is an [`Error`]. Errors are
//! never retried or swallowed inside the layer; [`Error::kind`] groups them
//! into the five categories callers usually branch on.

use std::fmt;

use thiserror::Error;

use crate::types::TypeTag;

/// Result type alias using the Graphlink [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the native boundary layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An operation was attempted on a released (or never bound) handle.
    #[error("{0} has already been released")]
    Disposed(&'static str),

    /// A handle was bound twice.
    #[error("{0} is already bound to a native resource")]
    AlreadyBound(&'static str),

    /// A typed accessor was used on a value of a different native type.
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        /// The tag the accessor expects.
        expected: TypeTag,
        /// The tag the native value actually reports.
        actual: TypeTag,
    },

    /// A composite index fell outside `[0, len)`.
    #[error("index {index} out of range for {container} of length {len}")]
    OutOfRange {
        /// What was indexed (list, struct, map, ...).
        container: &'static str,
        /// The requested index.
        index: u64,
        /// The number of elements.
        len: u64,
    },

    /// A native call returned a non-success status.
    #[error(transparent)]
    Native(#[from] NativeError),

    /// The engine returned a well-formed but unsupported response.
    #[error("{0}")]
    Domain(String),

    /// `next()` was called on a cursor with no remaining rows.
    #[error("query result has no more rows")]
    Exhausted,

    /// A column name lookup found no match.
    #[error("column '{0}' not found in query result")]
    UnknownColumn(String),

    /// Native data could not be converted into its managed representation.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// The background release worker could not be started or has stopped.
    #[error("release worker: {0}")]
    ReleaseWorker(String),
}

impl Error {
    /// Creates a native-failure error for `operation`.
    pub fn native(operation: &'static str, message: Option<String>) -> Self {
        Self::Native(NativeError { operation, message })
    }

    /// Returns the taxonomy category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Disposed(_) | Self::AlreadyBound(_) => ErrorKind::Disposed,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::OutOfRange { .. } | Self::UnknownColumn(_) => ErrorKind::Range,
            Self::Native(_) | Self::Domain(_) | Self::Conversion(_) | Self::ReleaseWorker(_) => {
                ErrorKind::Native
            }
            Self::Exhausted => ErrorKind::Exhausted,
        }
    }
}

/// A failed native call, carrying the engine's own message when available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    /// The native entry point that failed.
    pub operation: &'static str,
    /// The engine's error text, if it reported one.
    pub message: Option<String>,
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "native call {} failed: {}", self.operation, message),
            None => write!(f, "native call {} failed", self.operation),
        }
    }
}

impl std::error::Error for NativeError {}

/// Coarse error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Use of a released handle. Always a programming error.
    Disposed,
    /// Typed accessor against a differently typed value.
    TypeMismatch,
    /// Index or name outside the container.
    Range,
    /// Native failure or invalid engine response.
    Native,
    /// Cursor advanced past its last row.
    Exhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_error_display() {
        let err = Error::native("value_get_int32", Some("value is null".into()));
        assert_eq!(
            err.to_string(),
            "native call value_get_int32 failed: value is null"
        );

        let err = Error::native("value_destroy", None);
        assert_eq!(err.to_string(), "native call value_destroy failed");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::Disposed("value").kind(), ErrorKind::Disposed);
        assert_eq!(
            Error::TypeMismatch {
                expected: TypeTag::Int32,
                actual: TypeTag::String,
            }
            .kind(),
            ErrorKind::TypeMismatch
        );
        assert_eq!(
            Error::OutOfRange {
                container: "list",
                index: 3,
                len: 3,
            }
            .kind(),
            ErrorKind::Range
        );
        assert_eq!(Error::UnknownColumn("x".into()).kind(), ErrorKind::Range);
        assert_eq!(Error::Domain("empty path".into()).kind(), ErrorKind::Native);
        assert_eq!(Error::Exhausted.kind(), ErrorKind::Exhausted);
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = Error::TypeMismatch {
            expected: TypeTag::Int32,
            actual: TypeTag::String,
        };
        assert_eq!(err.to_string(), "type mismatch: expected INT32, found STRING");
    }
}
