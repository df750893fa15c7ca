//! String, blob and UUID wrappers. All three come back as engine strings.

use std::fmt;

use graphlink_common::types::TypeTag;
use graphlink_common::utils::error::{Error, Result};
use graphlink_native::{NativeApi, NativeState, RawString, RawValue};
use uuid::Uuid;

use super::{ValueExt, value_wrapper};
use crate::handle::ValueHandle;

fn read_engine_string(
    handle: &ValueHandle<'_>,
    operation: &'static str,
    expected: TypeTag,
    get: impl FnOnce(&dyn NativeApi, RawValue, &mut RawString) -> NativeState,
) -> Result<Vec<u8>> {
    let raw = handle.raw()?;
    let bridge = handle.bridge();
    let mut out = RawString::default();
    let state = get(bridge.api(), raw, &mut out);
    bridge.check_typed(state, operation, raw, expected)?;
    bridge.take_bytes(out, operation)
}

/// A native STRING.
pub struct StringValue<'a> {
    handle: ValueHandle<'a>,
}

impl<'a> StringValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>) -> Self {
        Self { handle }
    }

    /// Reads the string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] if the engine returns invalid UTF-8,
    /// or a type mismatch or native error.
    pub fn value(&self) -> Result<String> {
        let bytes = read_engine_string(&self.handle, "value_get_string", TypeTag::String, |api, raw, out| {
            api.value_get_string(raw, out)
        })?;
        String::from_utf8(bytes).map_err(|e| Error::Conversion(format!("string is not valid UTF-8: {e}")))
    }
}

/// A native BLOB.
///
/// The engine hands blobs out as hex text; [`BlobValue::value`] decodes it.
pub struct BlobValue<'a> {
    handle: ValueHandle<'a>,
}

impl<'a> BlobValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>) -> Self {
        Self { handle }
    }

    /// Reads the raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] if the engine text is not valid hex,
    /// or a type mismatch or native error.
    pub fn value(&self) -> Result<Vec<u8>> {
        let text = read_engine_string(&self.handle, "value_get_blob", TypeTag::Blob, |api, raw, out| {
            api.value_get_blob(raw, out)
        })?;
        hex::decode(text).map_err(|e| Error::Conversion(format!("blob is not valid hex: {e}")))
    }
}

/// A native UUID.
pub struct UuidValue<'a> {
    handle: ValueHandle<'a>,
}

impl<'a> UuidValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>) -> Self {
        Self { handle }
    }

    /// Reads the UUID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] if the engine text is not a UUID,
    /// or a type mismatch or native error.
    pub fn value(&self) -> Result<Uuid> {
        let text = read_engine_string(&self.handle, "value_get_uuid", TypeTag::Uuid, |api, raw, out| {
            api.value_get_uuid(raw, out)
        })?;
        let text = std::str::from_utf8(&text)
            .map_err(|e| Error::Conversion(format!("UUID text is not valid UTF-8: {e}")))?;
        Uuid::parse_str(text).map_err(|e| Error::Conversion(format!("invalid UUID '{text}': {e}")))
    }
}

value_wrapper!(StringValue, BlobValue, UuidValue);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphlink_common::types::Value;
    use graphlink_common::ErrorKind;
    use graphlink_native::MemoryEngine;

    use crate::bridge::Bridge;
    use crate::value::NativeValue;

    fn setup() -> (Arc<MemoryEngine>, Bridge) {
        let engine = Arc::new(MemoryEngine::new());
        let bridge = Bridge::new(engine.clone()).unwrap();
        (engine, bridge)
    }

    #[test]
    fn test_utf8_round_trip() {
        let (engine, bridge) = setup();
        {
            let value = bridge.create_value(&Value::from("héllo")).unwrap();
            let NativeValue::String(s) = &value else {
                panic!("expected a string");
            };
            assert_eq!(s.value().unwrap(), "héllo");
            assert_eq!(s.value().unwrap().chars().count(), 5);
        }
        bridge.flush_releases();
        // the value and every string buffer read from it are gone
        assert_eq!(engine.live_objects(), 0);
        assert!(engine.stats().string_destroys >= 2);
    }

    #[test]
    fn test_blob_round_trip() {
        let (_engine, bridge) = setup();
        let value = bridge.create_value(&Value::Blob(vec![0x00, 0xFF, 0x10])).unwrap();
        let NativeValue::Blob(blob) = &value else {
            panic!("expected a blob");
        };
        assert_eq!(blob.value().unwrap(), vec![0x00, 0xFF, 0x10]);
    }

    #[test]
    fn test_uuid() {
        let (_engine, bridge) = setup();
        let id = uuid::Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let value = bridge.create_value(&Value::Uuid(id)).unwrap();
        let NativeValue::Uuid(wrapper) = &value else {
            panic!("expected a uuid");
        };
        assert_eq!(wrapper.value().unwrap(), id);
    }

    #[test]
    fn test_string_accessor_on_int() {
        let (engine, bridge) = setup();
        let raw = engine.load_value(&Value::Int64(3));
        let wrong = super::StringValue::new(crate::handle::NativeHandle::from_raw(&bridge, raw));
        assert_eq!(wrong.value().unwrap_err().kind(), ErrorKind::TypeMismatch);
    }
}
