//! Node, relationship and path wrappers.

use std::cell::OnceCell;
use std::fmt;

use graphlink_common::types::{InternalId, NodeSnapshot, RelSnapshot, TypeTag};
use graphlink_common::utils::error::{Error, Result};
use graphlink_native::{NativeApi, NativeState, RawString, RawValue};
use indexmap::IndexMap;

use super::scalar::{read_internal_id, read_typed};
use super::{
    ListValue, NativeValue, StringValue, ValueExt, cached_count, check_index, child, read_text,
    snapshot_properties, value_wrapper,
};
use crate::handle::{NativeHandle, ValueHandle};

type ChildCall = fn(&dyn NativeApi, RawValue, &mut RawValue) -> NativeState;
type IndexedChildCall = fn(&dyn NativeApi, RawValue, u64, &mut RawValue) -> NativeState;
type NameCall = fn(&dyn NativeApi, RawValue, u64, &mut RawString) -> NativeState;
type CountCall = fn(&dyn NativeApi, RawValue, &mut u64) -> NativeState;

/// The entry points for one graph element kind.
struct EntityCalls {
    tag: TypeTag,
    id: (&'static str, ChildCall),
    label: (&'static str, ChildCall),
    property_size: (&'static str, CountCall),
    property_name: (&'static str, NameCall),
    property_value: (&'static str, IndexedChildCall),
}

static NODE_CALLS: EntityCalls = EntityCalls {
    tag: TypeTag::Node,
    id: ("node_val_get_id_val", |api, raw, out| api.node_val_get_id_val(raw, out)),
    label: ("node_val_get_label_val", |api, raw, out| api.node_val_get_label_val(raw, out)),
    property_size: ("node_val_get_property_size", |api, raw, out| {
        api.node_val_get_property_size(raw, out)
    }),
    property_name: ("node_val_get_property_name_at", |api, raw, index, out| {
        api.node_val_get_property_name_at(raw, index, out)
    }),
    property_value: ("node_val_get_property_value_at", |api, raw, index, out| {
        api.node_val_get_property_value_at(raw, index, out)
    }),
};

static REL_CALLS: EntityCalls = EntityCalls {
    tag: TypeTag::Rel,
    id: ("rel_val_get_id_val", |api, raw, out| api.rel_val_get_id_val(raw, out)),
    label: ("rel_val_get_label_val", |api, raw, out| api.rel_val_get_label_val(raw, out)),
    property_size: ("rel_val_get_property_size", |api, raw, out| {
        api.rel_val_get_property_size(raw, out)
    }),
    property_name: ("rel_val_get_property_name_at", |api, raw, index, out| {
        api.rel_val_get_property_name_at(raw, index, out)
    }),
    property_value: ("rel_val_get_property_value_at", |api, raw, index, out| {
        api.rel_val_get_property_value_at(raw, index, out)
    }),
};

/// Property positions keyed by lowercased name, in declaration order.
///
/// When two names differ only in case, the first one keeps the key.
pub type PropertyIndex = IndexMap<String, u64>;

/// State shared by nodes and relationships.
struct Entity<'a> {
    handle: ValueHandle<'a>,
    calls: &'static EntityCalls,
    count: OnceCell<u64>,
    index: OnceCell<PropertyIndex>,
}

impl<'a> Entity<'a> {
    fn new(handle: ValueHandle<'a>, calls: &'static EntityCalls) -> Self {
        Self {
            handle,
            calls,
            count: OnceCell::new(),
            index: OnceCell::new(),
        }
    }

    /// Reads an engine-owned INTERNAL_ID child.
    fn id_child(&self, (operation, call): (&'static str, ChildCall)) -> Result<InternalId> {
        let raw = self.handle.raw()?;
        let bridge = self.handle.bridge();
        let mut out = RawValue::default();
        bridge.check(call(bridge.api(), raw, &mut out), operation)?;
        read_internal_id(&NativeHandle::from_raw(bridge, out))
    }

    fn id(&self) -> Result<InternalId> {
        self.id_child(self.calls.id)
    }

    fn label(&self) -> Result<String> {
        let (operation, call) = self.calls.label;
        let raw = self.handle.raw()?;
        let bridge = self.handle.bridge();
        let mut out = RawValue::default();
        bridge.check(call(bridge.api(), raw, &mut out), operation)?;
        StringValue::new(NativeHandle::from_raw(bridge, out)).value()
    }

    fn property_count(&self) -> Result<u64> {
        let (operation, call) = self.calls.property_size;
        cached_count(&self.count, || {
            read_typed(&self.handle, operation, self.calls.tag, |api, raw, out| call(api, raw, out))
        })
    }

    fn property_name_at(&self, index: u64) -> Result<String> {
        check_index("properties", index, self.property_count()?)?;
        let (operation, call) = self.calls.property_name;
        read_text(&self.handle, operation, |api, raw, out| call(api, raw, index, out))
    }

    fn property_value_at(&self, index: u64) -> Result<NativeValue<'_>> {
        check_index("properties", index, self.property_count()?)?;
        let (operation, call) = self.calls.property_value;
        child(&self.handle, operation, |api, raw, out| call(api, raw, index, out))
    }

    fn property_index(&self) -> Result<&PropertyIndex> {
        if let Some(index) = self.index.get() {
            return Ok(index);
        }
        let mut index = PropertyIndex::new();
        for position in 0..self.property_count()? {
            let name = self.property_name_at(position)?;
            // first occurrence wins on case-insensitive collisions
            index.entry(name.to_lowercase()).or_insert(position);
        }
        Ok(self.index.get_or_init(|| index))
    }

    fn property_names(&self) -> Result<Vec<String>> {
        (0..self.property_count()?)
            .map(|position| self.property_name_at(position))
            .collect()
    }

    fn properties(&self) -> Result<Vec<(String, NativeValue<'_>)>> {
        (0..self.property_count()?)
            .map(|position| {
                Ok((
                    self.property_name_at(position)?,
                    self.property_value_at(position)?,
                ))
            })
            .collect()
    }

    fn property(&self, name: &str) -> Result<Option<NativeValue<'_>>> {
        match self.property_index()?.get(&name.to_lowercase()) {
            Some(position) => self.property_value_at(*position).map(Some),
            None => Ok(None),
        }
    }
}

/// Implements the shared property accessors on a wrapper with an `entity` field.
macro_rules! entity_accessors {
    ($name:ident) => {
        impl<'a> $name<'a> {
            /// Reads the internal id.
            ///
            /// # Errors
            ///
            /// Returns an error if a native call fails.
            pub fn id(&self) -> Result<InternalId> {
                self.entity.id()
            }

            /// Reads the label.
            ///
            /// # Errors
            ///
            /// Returns an error if a native call fails.
            pub fn label(&self) -> Result<String> {
                self.entity.label()
            }

            /// Returns the number of properties.
            ///
            /// # Errors
            ///
            /// Returns an error if the native call fails.
            pub fn property_count(&self) -> Result<u64> {
                self.entity.property_count()
            }

            /// Returns the name of property `index`.
            ///
            /// # Errors
            ///
            /// Returns [`Error::OutOfRange`] if `index >= property_count()`.
            pub fn property_name_at(&self, index: u64) -> Result<String> {
                self.entity.property_name_at(index)
            }

            /// Returns the value of property `index`.
            ///
            /// # Errors
            ///
            /// Returns [`Error::OutOfRange`] if `index >= property_count()`.
            pub fn property_value_at(&self, index: u64) -> Result<NativeValue<'_>> {
                self.entity.property_value_at(index)
            }

            /// Returns property names in declaration order.
            ///
            /// # Errors
            ///
            /// Returns the first error raised while reading a name.
            pub fn property_names(&self) -> Result<Vec<String>> {
                self.entity.property_names()
            }

            /// Returns every property in declaration order.
            ///
            /// # Errors
            ///
            /// Returns the first error raised while reading a property.
            pub fn properties(&self) -> Result<Vec<(String, NativeValue<'_>)>> {
                self.entity.properties()
            }

            /// Returns the ordered, case-insensitive property index.
            ///
            /// Built on first use and cached. Keys are lowercased names in
            /// declaration order; values are positions for
            /// [`property_value_at`](Self::property_value_at).
            ///
            /// # Errors
            ///
            /// Returns the first error raised while reading a name.
            pub fn properties_by_name(&self) -> Result<&PropertyIndex> {
                self.entity.property_index()
            }

            /// Looks a property up by case-insensitive name.
            ///
            /// The name index is built on first use and cached.
            ///
            /// # Errors
            ///
            /// Returns an error if building the index or reading the value fails.
            pub fn property(&self, name: &str) -> Result<Option<NativeValue<'_>>> {
                self.entity.property(name)
            }
        }

        impl<'a> ValueExt<'a> for $name<'a> {
            fn handle(&self) -> &ValueHandle<'a> {
                &self.entity.handle
            }

            fn into_handle(self) -> ValueHandle<'a> {
                self.entity.handle
            }
        }

        impl fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("handle", &self.entity.handle)
                    .finish_non_exhaustive()
            }
        }
    };
}

/// A native NODE.
pub struct NodeValue<'a> {
    entity: Entity<'a>,
}

impl<'a> NodeValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>) -> Self {
        Self {
            entity: Entity::new(handle, &NODE_CALLS),
        }
    }

    /// Copies the node into an owned snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while reading the node.
    pub fn snapshot(&self) -> Result<NodeSnapshot> {
        Ok(NodeSnapshot {
            id: self.id()?,
            label: self.label()?,
            properties: snapshot_properties(self.properties()?)?,
        })
    }
}

entity_accessors!(NodeValue);

/// A native REL.
pub struct RelValue<'a> {
    entity: Entity<'a>,
}

impl<'a> RelValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>) -> Self {
        Self {
            entity: Entity::new(handle, &REL_CALLS),
        }
    }

    /// Reads the source node id.
    ///
    /// # Errors
    ///
    /// Returns an error if a native call fails.
    pub fn src_id(&self) -> Result<InternalId> {
        self.entity.id_child(("rel_val_get_src_id_val", |api, raw, out| {
            api.rel_val_get_src_id_val(raw, out)
        }))
    }

    /// Reads the destination node id.
    ///
    /// # Errors
    ///
    /// Returns an error if a native call fails.
    pub fn dst_id(&self) -> Result<InternalId> {
        self.entity.id_child(("rel_val_get_dst_id_val", |api, raw, out| {
            api.rel_val_get_dst_id_val(raw, out)
        }))
    }

    /// Copies the relationship into an owned snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while reading the relationship.
    pub fn snapshot(&self) -> Result<RelSnapshot> {
        Ok(RelSnapshot {
            id: self.id()?,
            src: self.src_id()?,
            dst: self.dst_id()?,
            label: self.label()?,
            properties: snapshot_properties(self.properties()?)?,
        })
    }
}

entity_accessors!(RelValue);

/// A native RECURSIVE_REL: a variable-length path.
pub struct RecursiveRelValue<'a> {
    handle: ValueHandle<'a>,
}

impl<'a> RecursiveRelValue<'a> {
    pub(crate) fn new(handle: ValueHandle<'a>) -> Self {
        Self { handle }
    }

    fn path_list(&self, what: &str, operation: &'static str, call: ChildCall) -> Result<ListValue<'_>> {
        let raw = self.handle.raw()?;
        let bridge = self.handle.bridge();
        let mut out = RawValue::default();
        bridge.check(call(bridge.api(), raw, &mut out), operation)?;
        let list = ListValue::new(NativeHandle::from_raw(bridge, out));
        if list.count()? == 0 {
            return Err(Error::Domain(format!("recursive relationship has no {what}")));
        }
        Ok(list)
    }

    /// Returns the nodes along the path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] if the engine returns an empty list.
    pub fn nodes(&self) -> Result<ListValue<'_>> {
        self.path_list("nodes", "value_get_recursive_rel_node_list", |api, raw, out| {
            api.value_get_recursive_rel_node_list(raw, out)
        })
    }

    /// Returns the relationships along the path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] if the engine returns an empty list.
    pub fn rels(&self) -> Result<ListValue<'_>> {
        self.path_list("relationships", "value_get_recursive_rel_rel_list", |api, raw, out| {
            api.value_get_recursive_rel_rel_list(raw, out)
        })
    }

    /// Returns the nodes and relationships along the path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Domain`] if either list is empty.
    pub fn path(&self) -> Result<(ListValue<'_>, ListValue<'_>)> {
        Ok((self.nodes()?, self.rels()?))
    }
}

value_wrapper!(RecursiveRelValue);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphlink_common::types::Value;
    use graphlink_common::ErrorKind;
    use graphlink_native::MemoryEngine;

    use super::*;
    use crate::bridge::Bridge;

    fn setup() -> (Arc<MemoryEngine>, Bridge) {
        let engine = Arc::new(MemoryEngine::new());
        let bridge = Bridge::new(engine.clone()).unwrap();
        (engine, bridge)
    }

    fn alice() -> NodeSnapshot {
        NodeSnapshot {
            id: InternalId::new(0, 7),
            label: "Person".into(),
            properties: vec![
                ("Name".into(), Value::from("Alice")),
                ("age".into(), Value::Int64(30)),
            ],
        }
    }

    fn knows(src: u64, dst: u64) -> RelSnapshot {
        RelSnapshot {
            id: InternalId::new(2, src),
            src: InternalId::new(0, src),
            dst: InternalId::new(0, dst),
            label: "KNOWS".into(),
            properties: vec![("since".into(), Value::Int64(2020))],
        }
    }

    #[test]
    fn test_node_accessors() {
        let (engine, bridge) = setup();
        let value = bridge.adopt_value(engine.load_value(&Value::Node(alice()))).unwrap();
        let node = value.as_node().unwrap();

        assert_eq!(node.id().unwrap(), InternalId::new(0, 7));
        assert_eq!(node.label().unwrap(), "Person");
        assert_eq!(node.property_count().unwrap(), 2);
        assert_eq!(node.property_names().unwrap(), ["Name", "age"]);

        let name = node.property("NAME").unwrap().unwrap();
        assert_eq!(name.to_value().unwrap(), Value::from("Alice"));
        assert!(node.property("missing").unwrap().is_none());
        assert_eq!(node.property_value_at(2).unwrap_err().kind(), ErrorKind::Range);

        assert_eq!(node.snapshot().unwrap(), alice());
    }

    #[test]
    fn test_properties_by_name() {
        let (engine, bridge) = setup();
        let mut node = alice();
        node.properties.push(("NAME".into(), Value::from("shadowed")));
        node.properties.push(("city".into(), Value::from("Oslo")));
        let value = bridge.adopt_value(engine.load_value(&Value::Node(node))).unwrap();
        let node = value.as_node().unwrap();

        let index = node.properties_by_name().unwrap();
        assert_eq!(index.keys().map(String::as_str).collect::<Vec<_>>(), ["name", "age", "city"]);
        assert_eq!(index.get("name"), Some(&0));
        assert_eq!(index.get_index(2), Some((&"city".to_string(), &3)));

        let (_, position) = index.get_index(0).unwrap();
        let first = node.property_value_at(*position).unwrap();
        assert_eq!(first.to_value().unwrap(), Value::from("Alice"));
        assert_eq!(node.property_count().unwrap(), 4);
    }

    #[test]
    fn test_rel_endpoints() {
        let (engine, bridge) = setup();
        let value = bridge.adopt_value(engine.load_value(&Value::Rel(knows(1, 2)))).unwrap();
        let rel = value.as_rel().unwrap();
        assert_eq!(rel.src_id().unwrap(), InternalId::new(0, 1));
        assert_eq!(rel.dst_id().unwrap(), InternalId::new(0, 2));
        assert_eq!(rel.label().unwrap(), "KNOWS");
        assert_eq!(value.to_value().unwrap(), Value::Rel(knows(1, 2)));
    }

    #[test]
    fn test_recursive_rel_path() {
        let (engine, bridge) = setup();
        let path = Value::RecursiveRel {
            nodes: vec![Value::Node(alice()), Value::Node(alice())],
            rels: vec![Value::Rel(knows(7, 7))],
        };
        let value = bridge.adopt_value(engine.load_value(&path)).unwrap();
        let NativeValue::RecursiveRel(rec) = &value else {
            panic!("expected a recursive rel");
        };
        let (nodes, rels) = rec.path().unwrap();
        assert_eq!(nodes.count().unwrap(), 2);
        assert_eq!(rels.count().unwrap(), 1);
        assert_eq!(value.to_value().unwrap(), path);
    }

    #[test]
    fn test_empty_path_is_domain_error() {
        let (engine, bridge) = setup();
        let path = Value::RecursiveRel {
            nodes: vec![],
            rels: vec![],
        };
        let value = bridge.adopt_value(engine.load_value(&path)).unwrap();
        let NativeValue::RecursiveRel(rec) = &value else {
            panic!("expected a recursive rel");
        };
        assert!(matches!(rec.nodes(), Err(Error::Domain(_))));
        assert!(matches!(rec.rels(), Err(Error::Domain(_))));
    }
}
