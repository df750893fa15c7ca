//! List, array, struct and map wrappers.
//!
//! Children are engine-owned views into the parent's memory. Every accessor
//! hands them out borrowing `&self`, so a child can never outlive the
//! composite it came from.

use std::cell::OnceCell;
use std::fmt;

use graphlink_common::types::TypeTag;
use graphlink_common::utils::error::{Error, Result};

use super::scalar::read_typed;
use super::{NativeValue, ValueExt, cached_count, check_index, child, read_text, value_wrapper};
use crate::handle::ValueHandle;

fn list_size(handle: &ValueHandle<'_>, expected: TypeTag) -> Result<u64> {
    read_typed(handle, "value_get_list_size", expected, |api, raw, out| {
        api.value_get_list_size(raw, out)
    })
}

fn list_element<'p>(handle: &'p ValueHandle<'_>, index: u64) -> Result<NativeValue<'p>> {
    child(handle, "value_get_list_element", |api, raw, out| {
        api.value_get_list_element(raw, index, out)
    })
}

/// A native LIST.
///
/// The element count is read once, on first use. Elements are fetched one
/// native call at a time.
pub struct ListValue<'a> {
    handle: ValueHandle<'a>,
    count: OnceCell<u64>,
}

impl<'a> ListValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>) -> Self {
        Self {
            handle,
            count: OnceCell::new(),
        }
    }

    /// Returns the number of elements.
    ///
    /// # Errors
    ///
    /// Returns an error if the native call fails.
    pub fn count(&self) -> Result<u64> {
        cached_count(&self.count, || list_size(&self.handle, TypeTag::List))
    }

    /// Returns element `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `index >= count()`.
    pub fn element_at(&self, index: u64) -> Result<NativeValue<'_>> {
        check_index("list", index, self.count()?)?;
        list_element(&self.handle, index)
    }

    /// Iterates the elements in order. Each call starts from the beginning.
    pub fn iter(&self) -> ListIter<'_> {
        ListIter::new(&self.handle, self.count())
    }
}

/// A native ARRAY: a list whose length is fixed by its declared type.
pub struct ArrayValue<'a> {
    handle: ValueHandle<'a>,
    arity: Option<u64>,
    count: OnceCell<u64>,
}

impl<'a> ArrayValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>, arity: Option<u64>) -> Self {
        Self {
            handle,
            arity,
            count: OnceCell::new(),
        }
    }

    /// Returns the fixed arity from the declared type.
    ///
    /// Falls back to one native size read if the type carried no arity.
    ///
    /// # Errors
    ///
    /// Returns an error if the fallback native call fails.
    pub fn count(&self) -> Result<u64> {
        match self.arity {
            Some(arity) => Ok(arity),
            None => cached_count(&self.count, || list_size(&self.handle, TypeTag::Array)),
        }
    }

    /// Returns element `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `index >= count()`.
    pub fn element_at(&self, index: u64) -> Result<NativeValue<'_>> {
        check_index("array", index, self.count()?)?;
        list_element(&self.handle, index)
    }

    /// Iterates the elements in order.
    pub fn iter(&self) -> ListIter<'_> {
        ListIter::new(&self.handle, self.count())
    }
}

/// Lazy iterator over list or array elements.
pub struct ListIter<'s> {
    handle: &'s ValueHandle<'s>,
    next: u64,
    len: u64,
    error: Option<Error>,
}

impl<'s> ListIter<'s> {
    fn new(handle: &'s ValueHandle<'s>, len: Result<u64>) -> Self {
        let (len, error) = match len {
            Ok(len) => (len, None),
            Err(err) => (0, Some(err)),
        };
        Self {
            handle,
            next: 0,
            len,
            error,
        }
    }
}

impl<'s> Iterator for ListIter<'s> {
    type Item = Result<NativeValue<'s>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.error.take() {
            return Some(Err(err));
        }
        if self.next >= self.len {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(list_element(self.handle, index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.len - self.next).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

/// A native STRUCT.
pub struct StructValue<'a> {
    handle: ValueHandle<'a>,
    count: OnceCell<u64>,
}

impl<'a> StructValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>) -> Self {
        Self {
            handle,
            count: OnceCell::new(),
        }
    }

    /// Returns the number of fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the native call fails.
    pub fn field_count(&self) -> Result<u64> {
        cached_count(&self.count, || {
            read_typed(&self.handle, "value_get_struct_num_fields", TypeTag::Struct, |api, raw, out| {
                api.value_get_struct_num_fields(raw, out)
            })
        })
    }

    /// Returns the name of field `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `index >= field_count()`.
    pub fn field_name_at(&self, index: u64) -> Result<String> {
        check_index("struct", index, self.field_count()?)?;
        read_text(&self.handle, "value_get_struct_field_name", |api, raw, out| {
            api.value_get_struct_field_name(raw, index, out)
        })
    }

    /// Returns the value of field `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `index >= field_count()`.
    pub fn field_value_at(&self, index: u64) -> Result<NativeValue<'_>> {
        check_index("struct", index, self.field_count()?)?;
        child(&self.handle, "value_get_struct_field_value", |api, raw, out| {
            api.value_get_struct_field_value(raw, index, out)
        })
    }

    /// Returns every field in declaration order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while reading a field.
    pub fn fields(&self) -> Result<Vec<(String, NativeValue<'_>)>> {
        (0..self.field_count()?)
            .map(|index| Ok((self.field_name_at(index)?, self.field_value_at(index)?)))
            .collect()
    }

    /// Looks a field up by exact name.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while reading field names.
    pub fn field(&self, name: &str) -> Result<Option<NativeValue<'_>>> {
        for index in 0..self.field_count()? {
            if self.field_name_at(index)? == name {
                return self.field_value_at(index).map(Some);
            }
        }
        Ok(None)
    }
}

/// A native MAP. Entries keep the engine's order, duplicate keys included.
pub struct MapValue<'a> {
    handle: ValueHandle<'a>,
    size: OnceCell<u64>,
}

impl<'a> MapValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>) -> Self {
        Self {
            handle,
            size: OnceCell::new(),
        }
    }

    /// Returns the number of entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the native call fails.
    pub fn size(&self) -> Result<u64> {
        cached_count(&self.size, || {
            read_typed(&self.handle, "value_get_map_size", TypeTag::Map, |api, raw, out| {
                api.value_get_map_size(raw, out)
            })
        })
    }

    /// Returns the key of entry `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `index >= size()`.
    pub fn key_at(&self, index: u64) -> Result<NativeValue<'_>> {
        check_index("map", index, self.size()?)?;
        child(&self.handle, "value_get_map_key", |api, raw, out| {
            api.value_get_map_key(raw, index, out)
        })
    }

    /// Returns the value of entry `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `index >= size()`.
    pub fn value_at(&self, index: u64) -> Result<NativeValue<'_>> {
        check_index("map", index, self.size()?)?;
        child(&self.handle, "value_get_map_value", |api, raw, out| {
            api.value_get_map_value(raw, index, out)
        })
    }

    /// Returns every entry in order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while reading an entry.
    pub fn entries(&self) -> Result<Vec<(NativeValue<'_>, NativeValue<'_>)>> {
        (0..self.size()?)
            .map(|index| Ok((self.key_at(index)?, self.value_at(index)?)))
            .collect()
    }
}

value_wrapper!(ListValue, ArrayValue, StructValue, MapValue);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphlink_common::ErrorKind;
    use graphlink_common::types::Value;
    use graphlink_native::MemoryEngine;

    use crate::bridge::Bridge;
    use crate::value::{NativeValue, ValueExt};

    fn setup() -> (Arc<MemoryEngine>, Bridge) {
        let engine = Arc::new(MemoryEngine::new());
        let bridge = Bridge::new(engine.clone()).unwrap();
        (engine, bridge)
    }

    #[test]
    fn test_list_is_lazy() {
        let (engine, bridge) = setup();
        let items: Vec<Value> = (0..1000).map(Value::Int64).collect();
        let raw = engine.load_value(&Value::List(items));
        let value = bridge.adopt_value(raw).unwrap();
        let NativeValue::List(list) = &value else {
            panic!("expected a list");
        };

        let element = list.element_at(500).unwrap();
        assert_eq!(element.to_value().unwrap(), Value::Int64(500));

        let stats = engine.stats();
        assert_eq!(stats.list_element_reads, 1);
        assert!(stats.list_size_reads <= 1);
    }

    #[test]
    fn test_list_bounds_and_iteration() {
        let (_engine, bridge) = setup();
        let value = bridge
            .create_value(&Value::List(vec![Value::from("a"), Value::from("b")]))
            .unwrap();
        let NativeValue::List(list) = &value else {
            panic!("expected a list");
        };
        assert_eq!(list.count().unwrap(), 2);
        assert_eq!(list.element_at(2).unwrap_err().kind(), ErrorKind::Range);

        for _ in 0..2 {
            let items: Vec<Value> = list.iter().map(|item| item.unwrap().to_value().unwrap()).collect();
            assert_eq!(items, vec![Value::from("a"), Value::from("b")]);
        }
    }

    #[test]
    fn test_array_arity_from_type() {
        let (engine, bridge) = setup();
        let raw = engine.load_value(&Value::Array(vec![Value::Float(0.5); 3]));
        let value = bridge.adopt_value(raw).unwrap();
        let NativeValue::Array(array) = &value else {
            panic!("expected an array");
        };
        assert_eq!(array.count().unwrap(), 3);
        assert_eq!(engine.stats().list_size_reads, 0);
        assert_eq!(array.data_type().unwrap().to_string(), "ARRAY<FLOAT>[3]");
    }

    #[test]
    fn test_struct_fields() {
        let (_engine, bridge) = setup();
        let value = bridge
            .create_value(&Value::Struct(vec![
                ("name".into(), Value::from("Alice")),
                ("age".into(), Value::Int64(30)),
            ]))
            .unwrap();
        let NativeValue::Struct(s) = &value else {
            panic!("expected a struct");
        };
        assert_eq!(s.field_count().unwrap(), 2);
        assert_eq!(s.field_name_at(1).unwrap(), "age");
        let names: Vec<String> = s.fields().unwrap().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["name", "age"]);
        assert!(s.field("missing").unwrap().is_none());
        assert_eq!(s.field_value_at(5).unwrap_err().kind(), ErrorKind::Range);
    }

    #[test]
    fn test_map_keeps_duplicates() {
        let (_engine, bridge) = setup();
        let entries = vec![
            (Value::from("k"), Value::Int64(1)),
            (Value::from("k"), Value::Int64(2)),
        ];
        let value = bridge.create_value(&Value::Map(entries.clone())).unwrap();
        let NativeValue::Map(map) = &value else {
            panic!("expected a map");
        };
        assert_eq!(map.size().unwrap(), 2);
        assert_eq!(value.to_value().unwrap(), Value::Map(entries));
    }

    #[test]
    fn test_children_are_never_destroyed() {
        let (engine, bridge) = setup();
        {
            let raw = engine.load_value(&Value::List(vec![Value::Int64(1), Value::Int64(2)]));
            let value = bridge.adopt_value(raw).unwrap();
            let NativeValue::List(list) = &value else {
                panic!("expected a list");
            };
            for item in list.iter() {
                drop(item.unwrap());
            }
        }
        bridge.flush_releases();
        let stats = engine.stats();
        assert_eq!(stats.borrowed_destroys, 0);
        assert_eq!(stats.invalid_frees, 0);
        assert_eq!(stats.value_destroys, 1);
        assert_eq!(engine.live_objects(), 0);
    }
}
