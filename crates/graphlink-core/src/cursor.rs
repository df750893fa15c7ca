//! Query result cursors.

use std::cell::OnceCell;
use std::fmt;

use graphlink_common::types::{LogicalType, Value};
use graphlink_common::utils::error::{Error, Result};
use graphlink_native::{NativeQuerySummary, RawFlatTuple, RawLogicalType, RawQueryResult};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bridge::Bridge;
use crate::handle::NativeHandle;
use crate::row::Row;
use crate::value::check_index;

/// Where a cursor is in its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorState {
    /// Opened or reset, no row read yet.
    Created,
    /// At least one row read, more may follow.
    Advanced,
    /// No rows left.
    Exhausted,
}

/// Compile and execution times reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuerySummary {
    /// Time spent compiling the query, in milliseconds.
    pub compiling_ms: f64,
    /// Time spent executing the query, in milliseconds.
    pub execution_ms: f64,
}

impl From<NativeQuerySummary> for QuerySummary {
    fn from(summary: NativeQuerySummary) -> Self {
        Self {
            compiling_ms: summary.compiling_ms,
            execution_ms: summary.execution_ms,
        }
    }
}

/// Column names in result order, plus a case-insensitive lookup.
struct ColumnIndex {
    names: Vec<String>,
    by_name: HashMap<String, u64>,
}

/// A stateful iterator over the rows of one query result.
///
/// The engine keeps a single row buffer per result and overwrites it on every
/// advance, so a [`Row`] borrows the cursor mutably: the compiler rejects any
/// `next()` or `reset()` while a row is still alive.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use graphlink_common::types::{TypeTag, Value};
/// use graphlink_core::Bridge;
/// use graphlink_native::{MemoryEngine, ResultSet};
///
/// let engine = Arc::new(MemoryEngine::new());
/// let bridge = Bridge::new(engine.clone()).unwrap();
///
/// let result = engine.open_result(
///     ResultSet::new()
///         .column("name", TypeTag::String)
///         .row(vec![Value::from("Alice")])
///         .row(vec![Value::from("Bob")]),
/// );
/// let mut cursor = bridge.open_cursor(result).unwrap();
///
/// let mut names = Vec::new();
/// while let Some(row) = cursor.try_next().unwrap() {
///     names.push(row.get_by_name("NAME").unwrap().to_value().unwrap());
/// }
/// assert_eq!(names, vec![Value::from("Alice"), Value::from("Bob")]);
/// ```
pub struct QueryResultCursor {
    handle: NativeHandle<'static, RawQueryResult>,
    state: CursorState,
    columns: OnceCell<ColumnIndex>,
}

impl QueryResultCursor {
    pub(crate) fn open(bridge: &Bridge, raw: RawQueryResult) -> Result<Self> {
        // bound first so a failed result is still released
        let handle = NativeHandle::from_raw(bridge, raw);
        let raw = handle.raw()?;
        if !bridge.api().query_result_is_success(raw) {
            let message = bridge
                .read_string("query_result_get_error_message", |api, out| {
                    api.query_result_get_error_message(raw, out)
                })
                .ok();
            debug!(?message, "query failed");
            return Err(Error::native("query", message));
        }
        debug!(?raw, "cursor opened");
        Ok(Self {
            handle,
            state: CursorState::Created,
            columns: OnceCell::new(),
        })
    }

    fn bridge(&self) -> &Bridge {
        self.handle.bridge()
    }

    fn transition(&mut self, state: CursorState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "cursor state changed");
            self.state = state;
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Returns whether another row is available, without advancing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the cursor was released.
    pub fn has_next(&self) -> Result<bool> {
        let raw = self.handle.raw()?;
        Ok(self.bridge().api().query_result_has_next(raw))
    }

    /// Advances to the next row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exhausted`] if there are no rows left.
    pub fn next(&mut self) -> Result<Row<'_>> {
        let raw = self.handle.raw()?;
        if !self.bridge().api().query_result_has_next(raw) {
            self.transition(CursorState::Exhausted);
            return Err(Error::Exhausted);
        }

        let mut tuple = RawFlatTuple::default();
        let state = self.bridge().api().query_result_get_next(raw, &mut tuple);
        self.bridge().check(state, "query_result_get_next")?;

        if self.bridge().api().query_result_has_next(raw) {
            self.transition(CursorState::Advanced);
        } else {
            self.transition(CursorState::Exhausted);
        }

        let tuple = NativeHandle::from_raw(self.bridge(), tuple);
        Ok(Row::new(self, tuple))
    }

    /// Advances to the next row, or returns `None` at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if the native call fails.
    pub fn try_next(&mut self) -> Result<Option<Row<'_>>> {
        if !self.has_next()? {
            self.transition(CursorState::Exhausted);
            return Ok(None);
        }
        self.next().map(Some)
    }

    /// Rewinds to before the first row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the cursor was released.
    pub fn reset(&mut self) -> Result<()> {
        let raw = self.handle.raw()?;
        self.bridge().api().query_result_reset_iterator(raw);
        self.transition(CursorState::Created);
        Ok(())
    }

    /// Returns the number of columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the cursor was released.
    pub fn column_count(&self) -> Result<u64> {
        let raw = self.handle.raw()?;
        Ok(self.bridge().api().query_result_get_num_columns(raw))
    }

    fn columns(&self) -> Result<&ColumnIndex> {
        if let Some(columns) = self.columns.get() {
            return Ok(columns);
        }
        let raw = self.handle.raw()?;
        let count = self.column_count()?;
        let mut names = Vec::new();
        let mut by_name = HashMap::new();
        for index in 0..count {
            let name = self
                .bridge()
                .read_string("query_result_get_column_name", |api, out| {
                    api.query_result_get_column_name(raw, index, out)
                })?;
            by_name.entry(name.to_lowercase()).or_insert(index);
            names.push(name);
        }
        Ok(self.columns.get_or_init(|| ColumnIndex { names, by_name }))
    }

    /// Returns the column names in result order.
    ///
    /// # Errors
    ///
    /// Returns an error if reading a name fails.
    pub fn column_names(&self) -> Result<&[String]> {
        Ok(&self.columns()?.names)
    }

    /// Finds a column by case-insensitive name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumn`] if no column matches.
    pub fn column_index(&self, name: &str) -> Result<u64> {
        self.columns()?
            .by_name
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Reads the declared type of column `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `index >= column_count()`.
    pub fn column_data_type(&self, index: u64) -> Result<LogicalType> {
        check_index("columns", index, self.column_count()?)?;
        let raw = self.handle.raw()?;
        let mut ty = RawLogicalType::default();
        let state = self
            .bridge()
            .api()
            .query_result_get_column_data_type(raw, index, &mut ty);
        self.bridge()
            .check(state, "query_result_get_column_data_type")?;
        self.bridge()
            .describe_type(&NativeHandle::from_raw(self.bridge(), ty))
    }

    /// Returns the total number of rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the cursor was released.
    pub fn num_tuples(&self) -> Result<u64> {
        let raw = self.handle.raw()?;
        Ok(self.bridge().api().query_result_get_num_tuples(raw))
    }

    /// Reads the query's timings.
    ///
    /// # Errors
    ///
    /// Returns an error if the native call fails.
    pub fn summary(&self) -> Result<QuerySummary> {
        let raw = self.handle.raw()?;
        let mut summary = NativeQuerySummary::default();
        let state = self
            .bridge()
            .api()
            .query_result_get_query_summary(raw, &mut summary);
        self.bridge().check(state, "query_result_get_query_summary")?;
        Ok(summary.into())
    }

    /// Renders the whole result in the engine's table format.
    ///
    /// # Errors
    ///
    /// Returns an error if the native call fails.
    pub fn to_native_string(&self) -> Result<String> {
        let raw = self.handle.raw()?;
        self.bridge()
            .read_string("query_result_to_string", |api, out| {
                api.query_result_to_string(raw, out)
            })
    }

    /// Iterates the remaining rows as owned values.
    pub fn owned_rows(&mut self) -> OwnedRows<'_> {
        OwnedRows { cursor: self }
    }
}

impl fmt::Debug for QueryResultCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResultCursor")
            .field("handle", &self.handle)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Iterator over the remaining rows of a cursor, each copied into owned values.
pub struct OwnedRows<'c> {
    cursor: &'c mut QueryResultCursor,
}

impl Iterator for OwnedRows<'_> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.try_next() {
            Ok(Some(row)) => Some(row.to_values()),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
