//! A single row of a query result.

use std::fmt;

use graphlink_common::types::Value;
use graphlink_common::utils::error::Result;
use graphlink_native::{RawFlatTuple, RawValue};

use crate::cursor::QueryResultCursor;
use crate::handle::NativeHandle;
use crate::value::{NativeValue, check_index, dispatch};

/// The row a cursor is positioned on.
///
/// Cells are engine-owned and live in the cursor's row buffer, so every value
/// read from a row borrows it, and the row borrows the cursor.
pub struct Row<'c> {
    cursor: &'c QueryResultCursor,
    tuple: NativeHandle<'c, RawFlatTuple>,
}

impl<'c> Row<'c> {
    pub(crate) fn new(cursor: &'c QueryResultCursor, tuple: NativeHandle<'c, RawFlatTuple>) -> Self {
        Self { cursor, tuple }
    }

    /// Returns the number of cells.
    pub fn len(&self) -> Result<u64> {
        self.cursor.column_count()
    }

    /// Returns true if the result has no columns.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the cursor's column names.
    pub fn column_names(&self) -> Result<&'c [String]> {
        self.cursor.column_names()
    }

    /// Reads cell `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`](graphlink_common::Error::OutOfRange) if
    /// `index >= len()`.
    pub fn get(&self, index: u64) -> Result<NativeValue<'_>> {
        check_index("row", index, self.len()?)?;
        let raw = self.tuple.raw()?;
        let bridge = self.tuple.bridge();
        let mut out = RawValue::default();
        bridge.check(
            bridge.api().flat_tuple_get_value(raw, index, &mut out),
            "flat_tuple_get_value",
        )?;
        dispatch(NativeHandle::from_raw(bridge, out))
    }

    /// Reads the cell under a case-insensitive column name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`](graphlink_common::Error::UnknownColumn)
    /// if no column matches.
    pub fn get_by_name(&self, name: &str) -> Result<NativeValue<'_>> {
        self.get(self.cursor.column_index(name)?)
    }

    /// Copies every cell into owned values.
    pub fn to_values(&self) -> Result<Vec<Value>> {
        (0..self.len()?)
            .map(|index| self.get(index)?.to_value())
            .collect()
    }

    /// Renders the row in the engine's text format.
    pub fn to_native_string(&self) -> Result<String> {
        let raw = self.tuple.raw()?;
        self.tuple
            .bridge()
            .read_string("flat_tuple_to_string", |api, out| {
                api.flat_tuple_to_string(raw, out)
            })
    }
}

impl fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row").field("tuple", &self.tuple).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphlink_common::types::TypeTag;
    use graphlink_common::{Error, ErrorKind};
    use graphlink_native::{MemoryEngine, ResultSet};

    use crate::bridge::Bridge;
    use crate::value::ValueExt;

    use super::*;

    #[test]
    fn test_cells() {
        let engine = Arc::new(MemoryEngine::new());
        let bridge = Bridge::new(engine.clone()).unwrap();
        let raw = engine.open_result(
            ResultSet::new()
                .column("n", TypeTag::Int64)
                .column("tags", graphlink_common::types::LogicalType::list(TypeTag::String.into()))
                .row(vec![
                    Value::Int64(7),
                    Value::List(vec![Value::from("a"), Value::from("b")]),
                ]),
        );
        let mut cursor = bridge.open_cursor(raw).unwrap();
        let row = cursor.next().unwrap();

        assert_eq!(row.len().unwrap(), 2);
        assert!(!row.is_empty().unwrap());
        assert_eq!(row.column_names().unwrap(), ["n", "tags"]);
        assert_eq!(row.get(0).unwrap().to_value().unwrap(), Value::Int64(7));

        let tags = row.get_by_name("TAGS").unwrap();
        let list = tags.as_list().unwrap();
        assert_eq!(list.count().unwrap(), 2);
        assert_eq!(list.element_at(1).unwrap().to_value().unwrap(), Value::from("b"));

        let err = row.get(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        assert_eq!(
            row.get_by_name("missing").unwrap_err(),
            Error::UnknownColumn("missing".into())
        );
        assert_eq!(row.to_native_string().unwrap(), "7|[a,b]");
    }

    #[test]
    fn test_cells_are_engine_owned() {
        let engine = Arc::new(MemoryEngine::new());
        let bridge = Bridge::new(engine.clone()).unwrap();
        let raw = engine.open_result(
            ResultSet::new()
                .column("n", TypeTag::Int64)
                .row(vec![Value::Int64(1)])
                .row(vec![Value::Int64(2)]),
        );
        {
            let mut cursor = bridge.open_cursor(raw).unwrap();
            while let Some(row) = cursor.try_next().unwrap() {
                let cell = row.get(0).unwrap();
                assert_eq!(
                    cell.handle().ownership(),
                    Some(crate::handle::Ownership::Borrowed)
                );
            }
        }
        bridge.flush_releases();
        let stats = engine.stats();
        assert_eq!(stats.borrowed_destroys, 0);
        assert_eq!(stats.value_destroys, 0);
        assert_eq!(stats.tuple_destroys, 2);
        assert_eq!(stats.result_destroys, 1);
        assert_eq!(engine.live_objects(), 0);
    }
}
