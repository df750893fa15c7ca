//! Query results held by the in-process engine.

use graphlink_common::types::{LogicalType, Value};

use crate::raw::NativeQuerySummary;

/// A finished query, as handed to [`MemoryEngine::open_result`](super::MemoryEngine::open_result).
///
/// # Examples
///
/// ```
/// use graphlink_common::types::{TypeTag, Value};
/// use graphlink_native::ResultSet;
///
/// let result = ResultSet::new()
///     .column("name", TypeTag::String)
///     .column("age", TypeTag::Int64)
///     .row(vec![Value::from("Alice"), Value::Int64(30)])
///     .row(vec![Value::from("Bob"), Value::Null]);
///
/// assert_eq!(result.num_rows(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub(super) columns: Vec<(String, LogicalType)>,
    pub(super) rows: Vec<Vec<Value>>,
    pub(super) error: Option<String>,
    pub(super) summary: NativeQuerySummary,
}

impl ResultSet {
    /// Creates an empty, successful result with no columns.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a failed result carrying the engine's error message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, ty: impl Into<LogicalType>) -> Self {
        self.columns.push((name.into(), ty.into()));
        self
    }

    /// Appends a row. Missing trailing cells read as null.
    #[must_use]
    pub fn row(mut self, cells: Vec<Value>) -> Self {
        self.rows.push(cells);
        self
    }

    /// Sets the reported timings.
    #[must_use]
    pub fn with_summary(mut self, compiling_ms: f64, execution_ms: f64) -> Self {
        self.summary = NativeQuerySummary {
            compiling_ms,
            execution_ms,
        };
        self
    }

    /// Returns the number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

/// A result opened inside the engine.
pub(super) struct ResultObject {
    pub set: ResultSet,
    /// Index of the next row `get_next` hands out.
    pub position: usize,
    /// The shared row buffer: one cell per column, empty before the first row.
    pub buffer: Vec<usize>,
}

impl ResultObject {
    pub fn new(set: ResultSet) -> Self {
        Self {
            set,
            position: 0,
            buffer: Vec::new(),
        }
    }

    pub fn has_next(&self) -> bool {
        self.set.error.is_none() && self.position < self.set.rows.len()
    }

    pub fn column(&self, index: u64) -> Option<&(String, LogicalType)> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.set.columns.get(index))
    }
}
