//! Internal identifiers for graph elements.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The engine's internal identifier for a node or relationship.
///
/// A pair of the owning table and the row offset inside that table. Two
/// elements are the same element iff both parts match.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct InternalId {
    /// The table the element lives in.
    pub table_id: u64,
    /// The row offset inside the table.
    pub offset: u64,
}

impl InternalId {
    /// Creates a new internal id.
    #[inline]
    #[must_use]
    pub const fn new(table_id: u64, offset: u64) -> Self {
        Self { table_id, offset }
    }
}

impl fmt::Debug for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InternalId({}:{})", self.table_id, self.offset)
    }
}

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table_id, self.offset)
    }
}

impl From<(u64, u64)> for InternalId {
    fn from((table_id, offset): (u64, u64)) -> Self {
        Self::new(table_id, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_id() {
        let id = InternalId::new(2, 17);
        assert_eq!(id.to_string(), "2:17");
        assert_eq!(format!("{id:?}"), "InternalId(2:17)");
        assert_eq!(InternalId::from((2, 17)), id);
        assert!(InternalId::new(1, 99) < id);
    }
}
