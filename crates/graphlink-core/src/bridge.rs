//! The bridge context: native API, release queue and configuration.

use std::fmt;
use std::sync::Arc;

use graphlink_common::types::{LogicalType, TypeTag};
use graphlink_common::utils::error::{Error, Result};
use graphlink_native::{NativeApi, NativeState, RawLogicalType, RawQueryResult, RawString, RawValue};
use tracing::debug;

use crate::config::BridgeConfig;
use crate::cursor::QueryResultCursor;
use crate::handle::NativeHandle;
use crate::release::{ReleaseQueue, Resource};
use crate::value::{NativeValue, dispatch};

struct BridgeInner {
    api: Arc<dyn NativeApi>,
    config: BridgeConfig,
    queue: ReleaseQueue,
}

/// Shared entry point to a native engine.
///
/// Cheap to clone. Every handle keeps its bridge alive, so the release
/// worker stops only after the last handle is gone and the queue is drained.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use graphlink_common::types::Value;
/// use graphlink_core::Bridge;
/// use graphlink_native::MemoryEngine;
///
/// let bridge = Bridge::new(Arc::new(MemoryEngine::new())).unwrap();
/// let value = bridge.create_value(&Value::from("hello")).unwrap();
/// assert_eq!(value.to_value().unwrap(), Value::from("hello"));
/// ```
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl Bridge {
    /// Creates a bridge with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the release worker cannot be started.
    pub fn new(api: Arc<dyn NativeApi>) -> Result<Self> {
        Self::with_config(api, BridgeConfig::default())
    }

    /// Creates a bridge with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the release worker cannot be started.
    pub fn with_config(api: Arc<dyn NativeApi>, config: BridgeConfig) -> Result<Self> {
        let queue = ReleaseQueue::start(Arc::clone(&api), &config)?;
        Ok(Self {
            inner: Arc::new(BridgeInner { api, config, queue }),
        })
    }

    /// Returns the native API.
    pub fn api(&self) -> &dyn NativeApi {
        self.inner.api.as_ref()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Blocks until every release submitted so far has run.
    pub fn flush_releases(&self) {
        self.inner.queue.flush();
    }

    /// Returns how many native destroys the release worker has run.
    pub fn released_count(&self) -> u64 {
        self.inner.queue.released()
    }

    /// Wraps a caller-owned query result in a cursor.
    ///
    /// # Errors
    ///
    /// Returns the engine's error message if the query failed.
    pub fn open_cursor(&self, raw: RawQueryResult) -> Result<QueryResultCursor> {
        QueryResultCursor::open(self, raw)
    }

    /// Takes ownership of a caller-owned native value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] for engine-owned descriptors, which have to
    /// be reached through their parent instead.
    pub fn adopt_value(&self, raw: RawValue) -> Result<NativeValue<'static>> {
        if raw.owned_by_engine {
            return Err(Error::Domain(
                "cannot adopt an engine-owned value".to_string(),
            ));
        }
        dispatch(NativeHandle::from_raw(self, raw))
    }

    pub(crate) fn submit_release(&self, resource: Resource) {
        self.inner.queue.submit(resource);
    }

    /// Converts a native status into a result, attaching the engine's message.
    pub(crate) fn check(&self, state: NativeState, operation: &'static str) -> Result<()> {
        if state.is_success() {
            Ok(())
        } else {
            Err(Error::native(operation, self.api().last_error()))
        }
    }

    /// Like [`Bridge::check`], but reports a type mismatch when the value's
    /// actual tag differs from `expected`.
    pub(crate) fn check_typed(
        &self,
        state: NativeState,
        operation: &'static str,
        raw: RawValue,
        expected: TypeTag,
    ) -> Result<()> {
        if state.is_success() {
            return Ok(());
        }
        let message = self.api().last_error();
        let actual = self
            .value_type(raw)
            .map(|ty| ty.tag().unwrap_or(TypeTag::Any))?;
        if actual == expected {
            Err(Error::native(operation, message))
        } else {
            Err(Error::TypeMismatch { expected, actual })
        }
    }

    /// Reads and frees an engine string buffer.
    pub(crate) fn take_bytes(&self, string: RawString, operation: &'static str) -> Result<Vec<u8>> {
        let handle = NativeHandle::from_raw(self, string);
        let mut bytes = Vec::new();
        self.check(self.api().string_read(handle.raw()?, &mut bytes), operation)?;
        Ok(bytes)
    }

    /// Reads and frees an engine string buffer as UTF-8.
    pub(crate) fn take_string(&self, string: RawString, operation: &'static str) -> Result<String> {
        let bytes = self.take_bytes(string, operation)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::Conversion(format!("{operation} returned invalid UTF-8: {e}")))
    }

    /// Runs a native call that writes a string buffer, then reads it.
    pub(crate) fn read_string(
        &self,
        operation: &'static str,
        call: impl FnOnce(&dyn NativeApi, &mut RawString) -> NativeState,
    ) -> Result<String> {
        let mut out = RawString::default();
        self.check(call(self.api(), &mut out), operation)?;
        self.take_string(out, operation)
    }

    /// Reads a value's declared type.
    pub(crate) fn value_type(&self, raw: RawValue) -> Result<LogicalType> {
        let mut ty = RawLogicalType::default();
        self.check(self.api().value_get_data_type(raw, &mut ty), "value_get_data_type")?;
        self.describe_type(&NativeHandle::from_raw(self, ty))
    }

    /// Reads a logical type, including list element types and array arity.
    pub(crate) fn describe_type(&self, ty: &NativeHandle<'_, RawLogicalType>) -> Result<LogicalType> {
        let raw = ty.raw()?;
        let api = self.api();
        let mut logical = LogicalType::from_native_id(api.data_type_get_id(raw));
        match logical.tag() {
            Some(TypeTag::List | TypeTag::Array) => {
                let mut child = RawLogicalType::default();
                self.check(
                    api.data_type_get_child_type(raw, &mut child),
                    "data_type_get_child_type",
                )?;
                let child = NativeHandle::from_raw(self, child);
                logical = logical.with_child(self.describe_type(&child)?);
            }
            _ => {}
        }
        if logical.tag() == Some(TypeTag::Array) {
            let mut size = 0u64;
            self.check(
                api.data_type_get_num_elements_in_array(raw, &mut size),
                "data_type_get_num_elements_in_array",
            )?;
            logical = logical.with_array_size(size);
        }
        Ok(logical)
    }
}

impl Drop for BridgeInner {
    fn drop(&mut self) {
        debug!("bridge shut down, draining release queue");
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.inner.config)
            .field("released", &self.released_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlink_common::ErrorKind;
    use graphlink_common::types::Value;
    use graphlink_native::MemoryEngine;

    #[test]
    fn test_check_carries_engine_message() {
        let engine = Arc::new(MemoryEngine::new());
        let bridge = Bridge::new(engine.clone()).unwrap();
        let raw = engine.load_value(&Value::from("text"));

        let mut out = 0i64;
        let state = bridge.api().value_get_int64(raw, &mut out);
        let err = bridge.check(state, "value_get_int64").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Native);
        assert!(err.to_string().contains("expected INT64"));

        let err = bridge
            .check_typed(state, "value_get_int64", raw, TypeTag::Int64)
            .unwrap_err();
        assert_eq!(
            err,
            Error::TypeMismatch {
                expected: TypeTag::Int64,
                actual: TypeTag::String,
            }
        );

        engine.value_destroy(raw);
        bridge.flush_releases();
        assert_eq!(engine.live_objects(), 0);
    }

    #[test]
    fn test_describe_array_type() {
        let engine = Arc::new(MemoryEngine::new());
        let bridge = Bridge::new(engine.clone()).unwrap();
        let raw = engine.load_value(&Value::Array(vec![Value::Float(1.0), Value::Float(2.0)]));

        let ty = bridge.value_type(raw).unwrap();
        assert_eq!(ty.to_string(), "ARRAY<FLOAT>[2]");

        engine.value_destroy(raw);
        bridge.flush_releases();
        // both logical types were released through the queue
        assert_eq!(engine.stats().type_destroys, 2);
        assert_eq!(engine.live_objects(), 0);
    }

    #[test]
    fn test_adopt_rejects_borrowed() {
        let engine = Arc::new(MemoryEngine::new());
        let bridge = Bridge::new(engine).unwrap();
        let raw = RawValue::borrowed(graphlink_native::RawPtr::from_addr(0x20));
        assert!(matches!(bridge.adopt_value(raw), Err(Error::Domain(_))));
    }
}
