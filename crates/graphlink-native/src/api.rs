//! The native engine's foreign entry points.

use crate::raw::{
    NativeDate, NativeInt128, NativeInternalId, NativeInterval, NativeQuerySummary, NativeState,
    NativeTimestamp, RawFlatTuple, RawLogicalType, RawQueryResult, RawString, RawValue,
};

/// The native engine's C surface, one method per entry point.
///
/// Conventions:
///
/// - Fallible calls return [`NativeState`] and write their result through an
///   `out` parameter only on success. The failure text is then available
///   from [`NativeApi::last_error`] on the same thread.
/// - Values, results, rows and logical types returned with
///   `owned_by_engine == false` belong to the caller and must be passed to
///   the matching `*_destroy` call exactly once.
/// - Every [`RawString`] written by the engine must be passed to
///   [`NativeApi::destroy_string`].
/// - Descriptors are plain addresses. Passing a destroyed one is undefined
///   behaviour for a real engine.
pub trait NativeApi: Send + Sync {
    /// Returns the message of the last failed call on this thread.
    fn last_error(&self) -> Option<String>;

    // ---- strings ----

    /// Copies the bytes of an engine string buffer into `out`.
    fn string_read(&self, string: RawString, out: &mut Vec<u8>) -> NativeState;

    /// Frees an engine string buffer.
    fn destroy_string(&self, string: RawString);

    // ---- logical types ----

    /// Writes the declared type of `value`. The type is caller-owned.
    fn value_get_data_type(&self, value: RawValue, out: &mut RawLogicalType) -> NativeState;

    /// Returns the numeric type id of a logical type.
    fn data_type_get_id(&self, ty: RawLogicalType) -> u32;

    /// Writes the element type of a list or array type. The type is caller-owned.
    fn data_type_get_child_type(&self, ty: RawLogicalType, out: &mut RawLogicalType)
    -> NativeState;

    /// Writes the fixed element count of an array type.
    fn data_type_get_num_elements_in_array(&self, ty: RawLogicalType, out: &mut u64)
    -> NativeState;

    /// Frees a logical type.
    fn data_type_destroy(&self, ty: RawLogicalType);

    // ---- value lifecycle ----

    /// Returns whether the value's null flag is set.
    fn value_is_null(&self, value: RawValue) -> bool;

    /// Sets or clears the value's null flag.
    fn value_set_null(&self, value: RawValue, is_null: bool);

    /// Deep-copies a value into a new caller-owned value.
    fn value_clone(&self, value: RawValue, out: &mut RawValue) -> NativeState;

    /// Overwrites `value` with a deep copy of `other`.
    fn value_copy(&self, value: RawValue, other: RawValue) -> NativeState;

    /// Frees a caller-owned value and every child the engine handed out for it.
    fn value_destroy(&self, value: RawValue);

    /// Renders a value in the engine's text format.
    fn value_to_string(&self, value: RawValue, out: &mut RawString) -> NativeState;

    // ---- scalar reads ----

    /// Reads a BOOL.
    fn value_get_bool(&self, value: RawValue, out: &mut bool) -> NativeState;
    /// Reads an INT8.
    fn value_get_int8(&self, value: RawValue, out: &mut i8) -> NativeState;
    /// Reads an INT16.
    fn value_get_int16(&self, value: RawValue, out: &mut i16) -> NativeState;
    /// Reads an INT32.
    fn value_get_int32(&self, value: RawValue, out: &mut i32) -> NativeState;
    /// Reads an INT64.
    fn value_get_int64(&self, value: RawValue, out: &mut i64) -> NativeState;
    /// Reads a UINT8.
    fn value_get_uint8(&self, value: RawValue, out: &mut u8) -> NativeState;
    /// Reads a UINT16.
    fn value_get_uint16(&self, value: RawValue, out: &mut u16) -> NativeState;
    /// Reads a UINT32.
    fn value_get_uint32(&self, value: RawValue, out: &mut u32) -> NativeState;
    /// Reads a UINT64.
    fn value_get_uint64(&self, value: RawValue, out: &mut u64) -> NativeState;
    /// Reads an INT128.
    fn value_get_int128(&self, value: RawValue, out: &mut NativeInt128) -> NativeState;
    /// Reads a FLOAT.
    fn value_get_float(&self, value: RawValue, out: &mut f32) -> NativeState;
    /// Reads a DOUBLE.
    fn value_get_double(&self, value: RawValue, out: &mut f64) -> NativeState;
    /// Reads a DATE.
    fn value_get_date(&self, value: RawValue, out: &mut NativeDate) -> NativeState;
    /// Reads a TIMESTAMP (microseconds).
    fn value_get_timestamp(&self, value: RawValue, out: &mut NativeTimestamp) -> NativeState;
    /// Reads a TIMESTAMP_SEC.
    fn value_get_timestamp_sec(&self, value: RawValue, out: &mut NativeTimestamp) -> NativeState;
    /// Reads a TIMESTAMP_MS.
    fn value_get_timestamp_ms(&self, value: RawValue, out: &mut NativeTimestamp) -> NativeState;
    /// Reads a TIMESTAMP_NS.
    fn value_get_timestamp_ns(&self, value: RawValue, out: &mut NativeTimestamp) -> NativeState;
    /// Reads a TIMESTAMP_TZ (microseconds, UTC).
    fn value_get_timestamp_tz(&self, value: RawValue, out: &mut NativeTimestamp) -> NativeState;
    /// Reads an INTERVAL.
    fn value_get_interval(&self, value: RawValue, out: &mut NativeInterval) -> NativeState;
    /// Reads an INTERNAL_ID.
    fn value_get_internal_id(&self, value: RawValue, out: &mut NativeInternalId) -> NativeState;
    /// Reads a STRING into an engine string buffer.
    fn value_get_string(&self, value: RawValue, out: &mut RawString) -> NativeState;
    /// Reads a BLOB as hex text into an engine string buffer.
    fn value_get_blob(&self, value: RawValue, out: &mut RawString) -> NativeState;
    /// Reads a UUID as canonical text into an engine string buffer.
    fn value_get_uuid(&self, value: RawValue, out: &mut RawString) -> NativeState;

    // ---- list / array ----

    /// Writes the element count of a LIST or ARRAY.
    fn value_get_list_size(&self, value: RawValue, out: &mut u64) -> NativeState;

    /// Writes an engine-owned view of element `index`.
    fn value_get_list_element(&self, value: RawValue, index: u64, out: &mut RawValue)
    -> NativeState;

    // ---- struct ----

    /// Writes the field count of a STRUCT.
    fn value_get_struct_num_fields(&self, value: RawValue, out: &mut u64) -> NativeState;

    /// Writes the name of field `index`.
    fn value_get_struct_field_name(&self, value: RawValue, index: u64, out: &mut RawString)
    -> NativeState;

    /// Writes an engine-owned view of field `index`.
    fn value_get_struct_field_value(&self, value: RawValue, index: u64, out: &mut RawValue)
    -> NativeState;

    // ---- map ----

    /// Writes the entry count of a MAP.
    fn value_get_map_size(&self, value: RawValue, out: &mut u64) -> NativeState;

    /// Writes an engine-owned view of the key of entry `index`.
    fn value_get_map_key(&self, value: RawValue, index: u64, out: &mut RawValue) -> NativeState;

    /// Writes an engine-owned view of the value of entry `index`.
    fn value_get_map_value(&self, value: RawValue, index: u64, out: &mut RawValue)
    -> NativeState;

    // ---- node ----

    /// Writes an engine-owned INTERNAL_ID value holding the node id.
    fn node_val_get_id_val(&self, node: RawValue, out: &mut RawValue) -> NativeState;

    /// Writes an engine-owned STRING value holding the node label.
    fn node_val_get_label_val(&self, node: RawValue, out: &mut RawValue) -> NativeState;

    /// Writes the node's property count.
    fn node_val_get_property_size(&self, node: RawValue, out: &mut u64) -> NativeState;

    /// Writes the name of property `index`.
    fn node_val_get_property_name_at(&self, node: RawValue, index: u64, out: &mut RawString)
    -> NativeState;

    /// Writes an engine-owned view of property `index`.
    fn node_val_get_property_value_at(&self, node: RawValue, index: u64, out: &mut RawValue)
    -> NativeState;

    // ---- rel ----

    /// Writes an engine-owned INTERNAL_ID value holding the relationship id.
    fn rel_val_get_id_val(&self, rel: RawValue, out: &mut RawValue) -> NativeState;

    /// Writes an engine-owned INTERNAL_ID value holding the source node id.
    fn rel_val_get_src_id_val(&self, rel: RawValue, out: &mut RawValue) -> NativeState;

    /// Writes an engine-owned INTERNAL_ID value holding the destination node id.
    fn rel_val_get_dst_id_val(&self, rel: RawValue, out: &mut RawValue) -> NativeState;

    /// Writes an engine-owned STRING value holding the relationship label.
    fn rel_val_get_label_val(&self, rel: RawValue, out: &mut RawValue) -> NativeState;

    /// Writes the relationship's property count.
    fn rel_val_get_property_size(&self, rel: RawValue, out: &mut u64) -> NativeState;

    /// Writes the name of property `index`.
    fn rel_val_get_property_name_at(&self, rel: RawValue, index: u64, out: &mut RawString)
    -> NativeState;

    /// Writes an engine-owned view of property `index`.
    fn rel_val_get_property_value_at(&self, rel: RawValue, index: u64, out: &mut RawValue)
    -> NativeState;

    // ---- recursive rel ----

    /// Writes an engine-owned LIST of the path's nodes.
    fn value_get_recursive_rel_node_list(&self, value: RawValue, out: &mut RawValue)
    -> NativeState;

    /// Writes an engine-owned LIST of the path's relationships.
    fn value_get_recursive_rel_rel_list(&self, value: RawValue, out: &mut RawValue)
    -> NativeState;

    // ---- value creation (caller-owned results) ----

    /// Creates an untyped null.
    fn value_create_null(&self) -> RawValue;
    /// Creates a BOOL.
    fn value_create_bool(&self, value: bool) -> RawValue;
    /// Creates an INT8.
    fn value_create_int8(&self, value: i8) -> RawValue;
    /// Creates an INT16.
    fn value_create_int16(&self, value: i16) -> RawValue;
    /// Creates an INT32.
    fn value_create_int32(&self, value: i32) -> RawValue;
    /// Creates an INT64.
    fn value_create_int64(&self, value: i64) -> RawValue;
    /// Creates a UINT8.
    fn value_create_uint8(&self, value: u8) -> RawValue;
    /// Creates a UINT16.
    fn value_create_uint16(&self, value: u16) -> RawValue;
    /// Creates a UINT32.
    fn value_create_uint32(&self, value: u32) -> RawValue;
    /// Creates a UINT64.
    fn value_create_uint64(&self, value: u64) -> RawValue;
    /// Creates an INT128.
    fn value_create_int128(&self, value: NativeInt128) -> RawValue;
    /// Creates a FLOAT.
    fn value_create_float(&self, value: f32) -> RawValue;
    /// Creates a DOUBLE.
    fn value_create_double(&self, value: f64) -> RawValue;
    /// Creates a DATE.
    fn value_create_date(&self, value: NativeDate) -> RawValue;
    /// Creates a TIMESTAMP (microseconds).
    fn value_create_timestamp(&self, value: NativeTimestamp) -> RawValue;
    /// Creates a TIMESTAMP_SEC.
    fn value_create_timestamp_sec(&self, value: NativeTimestamp) -> RawValue;
    /// Creates a TIMESTAMP_MS.
    fn value_create_timestamp_ms(&self, value: NativeTimestamp) -> RawValue;
    /// Creates a TIMESTAMP_NS.
    fn value_create_timestamp_ns(&self, value: NativeTimestamp) -> RawValue;
    /// Creates a TIMESTAMP_TZ.
    fn value_create_timestamp_tz(&self, value: NativeTimestamp) -> RawValue;
    /// Creates an INTERVAL.
    fn value_create_interval(&self, value: NativeInterval) -> RawValue;
    /// Creates an INTERNAL_ID.
    fn value_create_internal_id(&self, value: NativeInternalId) -> RawValue;
    /// Creates a STRING.
    fn value_create_string(&self, value: &str) -> RawValue;
    /// Creates a BLOB.
    fn value_create_blob(&self, value: &[u8]) -> RawValue;

    /// Creates a UUID from its canonical text.
    fn value_create_uuid(&self, value: &str, out: &mut RawValue) -> NativeState;

    /// Creates a LIST holding deep copies of `elements`.
    ///
    /// The inputs stay caller-owned. Fails if the elements disagree on type.
    fn value_create_list(&self, elements: &[RawValue], out: &mut RawValue) -> NativeState;

    /// Creates a STRUCT holding deep copies of `values`, named by `names`.
    fn value_create_struct(&self, names: &[&str], values: &[RawValue], out: &mut RawValue)
    -> NativeState;

    /// Creates a MAP holding deep copies of `keys` and `values`, paired by position.
    fn value_create_map(&self, keys: &[RawValue], values: &[RawValue], out: &mut RawValue)
    -> NativeState;

    // ---- query result ----

    /// Returns whether the query succeeded.
    fn query_result_is_success(&self, result: RawQueryResult) -> bool;

    /// Writes the failure message of an unsuccessful query.
    fn query_result_get_error_message(&self, result: RawQueryResult, out: &mut RawString)
    -> NativeState;

    /// Returns the column count.
    fn query_result_get_num_columns(&self, result: RawQueryResult) -> u64;

    /// Writes the name of column `index`.
    fn query_result_get_column_name(&self, result: RawQueryResult, index: u64, out: &mut RawString)
    -> NativeState;

    /// Writes the declared type of column `index`. The type is caller-owned.
    fn query_result_get_column_data_type(
        &self,
        result: RawQueryResult,
        index: u64,
        out: &mut RawLogicalType,
    ) -> NativeState;

    /// Returns the total row count.
    fn query_result_get_num_tuples(&self, result: RawQueryResult) -> u64;

    /// Writes the query's timings.
    fn query_result_get_query_summary(
        &self,
        result: RawQueryResult,
        out: &mut NativeQuerySummary,
    ) -> NativeState;

    /// Returns whether another row is available.
    fn query_result_has_next(&self, result: RawQueryResult) -> bool;

    /// Advances to the next row, overwriting the shared row buffer.
    fn query_result_get_next(&self, result: RawQueryResult, out: &mut RawFlatTuple) -> NativeState;

    /// Rewinds the result to before its first row.
    fn query_result_reset_iterator(&self, result: RawQueryResult);

    /// Renders the whole result as a table.
    fn query_result_to_string(&self, result: RawQueryResult, out: &mut RawString) -> NativeState;

    /// Frees a caller-owned result, including its row buffer.
    fn query_result_destroy(&self, result: RawQueryResult);

    // ---- flat tuple ----

    /// Writes an engine-owned view of cell `index` of the row buffer.
    fn flat_tuple_get_value(&self, tuple: RawFlatTuple, index: u64, out: &mut RawValue)
    -> NativeState;

    /// Renders the row.
    fn flat_tuple_to_string(&self, tuple: RawFlatTuple, out: &mut RawString) -> NativeState;

    /// Frees a row descriptor. The shared row buffer stays with its result.
    fn flat_tuple_destroy(&self, tuple: RawFlatTuple);
}
