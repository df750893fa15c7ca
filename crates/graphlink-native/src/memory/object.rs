//! Heap objects of the in-process engine.

use graphlink_common::types::{
    InternalId, LogicalType, NodeSnapshot, RelSnapshot, TypeTag, Value,
};
use hashbrown::HashMap;
use smallvec::SmallVec;

use super::result::ResultObject;

/// Addresses start well above zero and step like real allocations.
const FIRST_ADDR: usize = 0x1000;
const ADDR_STEP: usize = 0x10;

pub(super) type Children = SmallVec<[usize; 8]>;

pub(super) enum Object {
    Value(ValueObject),
    LogicalType(LogicalType),
    String(Vec<u8>),
    QueryResult(ResultObject),
    FlatTuple { result: usize },
}

pub(super) struct ValueObject {
    pub ty: LogicalType,
    pub is_null: bool,
    pub payload: Payload,
    /// Set for values that live inside another object.
    pub parent: Option<usize>,
}

#[derive(Clone)]
pub(super) enum Payload {
    Empty,
    Scalar(Value),
    List(Children),
    Struct(Vec<(String, usize)>),
    Map(Vec<(usize, usize)>),
    Node {
        id: usize,
        label: usize,
        properties: Vec<(String, usize)>,
    },
    Rel {
        id: usize,
        src: usize,
        dst: usize,
        label: usize,
        properties: Vec<(String, usize)>,
    },
    RecursiveRel {
        nodes: usize,
        rels: usize,
    },
}

impl Payload {
    fn children(&self) -> Children {
        match self {
            Payload::Empty | Payload::Scalar(_) => Children::new(),
            Payload::List(items) => items.clone(),
            Payload::Struct(fields) => fields.iter().map(|(_, addr)| *addr).collect(),
            Payload::Map(entries) => entries.iter().flat_map(|(k, v)| [*k, *v]).collect(),
            Payload::Node {
                id,
                label,
                properties,
            } => [*id, *label]
                .into_iter()
                .chain(properties.iter().map(|(_, addr)| *addr))
                .collect(),
            Payload::Rel {
                id,
                src,
                dst,
                label,
                properties,
            } => [*id, *src, *dst, *label]
                .into_iter()
                .chain(properties.iter().map(|(_, addr)| *addr))
                .collect(),
            Payload::RecursiveRel { nodes, rels } => [*nodes, *rels].into_iter().collect(),
        }
    }

    /// Rebuilds the payload with every child address passed through `f`.
    fn try_map_children(&self, mut f: impl FnMut(usize) -> Option<usize>) -> Option<Payload> {
        Some(match self {
            Payload::Empty => Payload::Empty,
            Payload::Scalar(value) => Payload::Scalar(value.clone()),
            Payload::Struct(fields) => Payload::Struct(map_named(fields, &mut f)?),
            Payload::List(items) => {
                Payload::List(items.iter().map(|addr| f(*addr)).collect::<Option<_>>()?)
            }
            Payload::Map(entries) => Payload::Map(
                entries
                    .iter()
                    .map(|(k, v)| Some((f(*k)?, f(*v)?)))
                    .collect::<Option<_>>()?,
            ),
            Payload::Node {
                id,
                label,
                properties,
            } => Payload::Node {
                id: f(*id)?,
                label: f(*label)?,
                properties: map_named(properties, &mut f)?,
            },
            Payload::Rel {
                id,
                src,
                dst,
                label,
                properties,
            } => Payload::Rel {
                id: f(*id)?,
                src: f(*src)?,
                dst: f(*dst)?,
                label: f(*label)?,
                properties: map_named(properties, &mut f)?,
            },
            Payload::RecursiveRel { nodes, rels } => Payload::RecursiveRel {
                nodes: f(*nodes)?,
                rels: f(*rels)?,
            },
        })
    }
}

fn map_named(
    fields: &[(String, usize)],
    f: &mut impl FnMut(usize) -> Option<usize>,
) -> Option<Vec<(String, usize)>> {
    fields
        .iter()
        .map(|(name, addr)| Some((name.clone(), f(*addr)?)))
        .collect()
}

/// The declared type an owned value would get from the engine.
pub(super) fn type_of(value: &Value) -> LogicalType {
    match value {
        Value::Null => LogicalType::scalar(TypeTag::Any),
        Value::List(items) => LogicalType::list(element_type(items)),
        Value::Array(items) => LogicalType::array(element_type(items), items.len() as u64),
        Value::RecursiveRel { .. } => LogicalType::scalar(TypeTag::RecursiveRel),
        other => LogicalType::scalar(other.tag()),
    }
}

fn element_type(items: &[Value]) -> LogicalType {
    items
        .iter()
        .find(|item| !item.is_null())
        .map_or_else(|| LogicalType::scalar(TypeTag::Any), type_of)
}

/// Nulls take the declared type; everything else reports its own.
pub(super) fn type_for(value: &Value, declared: &LogicalType) -> LogicalType {
    if value.is_null() {
        declared.clone()
    } else {
        type_of(value)
    }
}

/// The engine heap: every live object by address.
pub(super) struct Slab {
    objects: HashMap<usize, Object>,
    next_addr: usize,
}

impl Slab {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            next_addr: FIRST_ADDR,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Hands out a fresh address. Addresses are never reused.
    pub fn reserve(&mut self) -> usize {
        let addr = self.next_addr;
        self.next_addr += ADDR_STEP;
        addr
    }

    pub fn insert(&mut self, object: Object) -> usize {
        let addr = self.reserve();
        self.objects.insert(addr, object);
        addr
    }

    pub fn put(&mut self, addr: usize, object: Object) {
        self.objects.insert(addr, object);
    }

    pub fn get(&self, addr: usize) -> Option<&Object> {
        self.objects.get(&addr)
    }

    pub fn get_mut(&mut self, addr: usize) -> Option<&mut Object> {
        self.objects.get_mut(&addr)
    }

    pub fn remove(&mut self, addr: usize) -> Option<Object> {
        self.objects.remove(&addr)
    }

    pub fn value(&self, addr: usize) -> Option<&ValueObject> {
        match self.objects.get(&addr) {
            Some(Object::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Allocates a value tree. Children are engine-owned by their parent.
    pub fn alloc_value(&mut self, value: &Value, ty: LogicalType, parent: Option<usize>) -> usize {
        let addr = self.reserve();
        let (is_null, payload) = self.build_payload(addr, value, &ty);
        self.put(
            addr,
            Object::Value(ValueObject {
                ty,
                is_null,
                payload,
                parent,
            }),
        );
        addr
    }

    /// Replaces the contents of the value at `addr`, keeping the address.
    pub fn rebuild_value(&mut self, addr: usize, value: &Value, ty: LogicalType) {
        let old_children = self.value(addr).map(|obj| obj.payload.children());
        for child in old_children.into_iter().flatten() {
            self.free_value_tree(child);
        }
        let (is_null, payload) = self.build_payload(addr, value, &ty);
        if let Some(Object::Value(obj)) = self.objects.get_mut(&addr) {
            obj.ty = ty;
            obj.is_null = is_null;
            obj.payload = payload;
        }
    }

    fn build_payload(&mut self, addr: usize, value: &Value, ty: &LogicalType) -> (bool, Payload) {
        let payload = match value {
            Value::Null => return (true, Payload::Empty),
            Value::List(items) | Value::Array(items) => {
                let element = ty
                    .child()
                    .cloned()
                    .unwrap_or_else(|| LogicalType::scalar(TypeTag::Any));
                Payload::List(self.alloc_children(items, &element, addr))
            }
            Value::Struct(fields) => Payload::Struct(self.alloc_named(fields, addr)),
            Value::Map(entries) => Payload::Map(
                entries
                    .iter()
                    .map(|(k, v)| {
                        let key = self.alloc_value(k, type_of(k), Some(addr));
                        let value = self.alloc_value(v, type_of(v), Some(addr));
                        (key, value)
                    })
                    .collect(),
            ),
            Value::Node(node) => Payload::Node {
                id: self.alloc_id(node.id, addr),
                label: self.alloc_label(&node.label, addr),
                properties: self.alloc_named(&node.properties, addr),
            },
            Value::Rel(rel) => Payload::Rel {
                id: self.alloc_id(rel.id, addr),
                src: self.alloc_id(rel.src, addr),
                dst: self.alloc_id(rel.dst, addr),
                label: self.alloc_label(&rel.label, addr),
                properties: self.alloc_named(&rel.properties, addr),
            },
            Value::RecursiveRel { nodes, rels } => Payload::RecursiveRel {
                nodes: self.alloc_list(nodes, TypeTag::Node, addr),
                rels: self.alloc_list(rels, TypeTag::Rel, addr),
            },
            scalar => Payload::Scalar(scalar.clone()),
        };
        (false, payload)
    }

    fn alloc_children(&mut self, items: &[Value], element: &LogicalType, parent: usize) -> Children {
        items
            .iter()
            .map(|item| self.alloc_value(item, type_for(item, element), Some(parent)))
            .collect()
    }

    fn alloc_named(&mut self, fields: &[(String, Value)], parent: usize) -> Vec<(String, usize)> {
        fields
            .iter()
            .map(|(name, value)| {
                (
                    name.clone(),
                    self.alloc_value(value, type_of(value), Some(parent)),
                )
            })
            .collect()
    }

    fn alloc_id(&mut self, id: InternalId, parent: usize) -> usize {
        self.alloc_value(
            &Value::InternalId(id),
            LogicalType::scalar(TypeTag::InternalId),
            Some(parent),
        )
    }

    fn alloc_label(&mut self, label: &str, parent: usize) -> usize {
        self.alloc_value(
            &Value::String(label.to_string()),
            LogicalType::scalar(TypeTag::String),
            Some(parent),
        )
    }

    fn alloc_list(&mut self, items: &[Value], element: TypeTag, parent: usize) -> usize {
        let element = LogicalType::scalar(element);
        let addr = self.reserve();
        let children = self.alloc_children(items, &element, addr);
        self.put(
            addr,
            Object::Value(ValueObject {
                ty: LogicalType::list(element),
                is_null: false,
                payload: Payload::List(children),
                parent: Some(parent),
            }),
        );
        addr
    }

    /// Frees a value and all of its children. Returns false if `addr` was not a value.
    pub fn free_value_tree(&mut self, addr: usize) -> bool {
        match self.objects.remove(&addr) {
            Some(Object::Value(obj)) => {
                for child in obj.payload.children() {
                    self.free_value_tree(child);
                }
                true
            }
            Some(other) => {
                self.objects.insert(addr, other);
                false
            }
            None => false,
        }
    }

    /// Deep-copies the value at `src`. Returns `None` if any part is missing.
    pub fn deep_copy(&mut self, src: usize, parent: Option<usize>) -> Option<usize> {
        let (ty, is_null, payload) = {
            let obj = self.value(src)?;
            (obj.ty.clone(), obj.is_null, obj.payload.clone())
        };
        let addr = self.reserve();
        let payload = payload.try_map_children(|child| self.deep_copy(child, Some(addr)))?;
        self.put(
            addr,
            Object::Value(ValueObject {
                ty,
                is_null,
                payload,
                parent,
            }),
        );
        Some(addr)
    }

    /// Overwrites the value at `dst` with a deep copy of `src`.
    pub fn copy_into(&mut self, dst: usize, src: usize) -> Option<()> {
        let (ty, is_null, payload) = {
            let obj = self.value(src)?;
            (obj.ty.clone(), obj.is_null, obj.payload.clone())
        };
        self.value(dst)?;
        let payload = payload.try_map_children(|child| self.deep_copy(child, Some(dst)))?;
        let old = self.value(dst).map(|obj| obj.payload.children());
        for child in old.into_iter().flatten() {
            self.free_value_tree(child);
        }
        if let Some(Object::Value(obj)) = self.objects.get_mut(&dst) {
            obj.ty = ty;
            obj.is_null = is_null;
            obj.payload = payload;
        }
        Some(())
    }

    /// Reads the value at `addr` back into an owned tree.
    pub fn snapshot(&self, addr: usize) -> Option<Value> {
        let obj = self.value(addr)?;
        if obj.is_null {
            return Some(Value::Null);
        }
        let named = |properties: &[(String, usize)]| -> Option<Vec<(String, Value)>> {
            properties
                .iter()
                .map(|(name, addr)| Some((name.clone(), self.snapshot(*addr)?)))
                .collect()
        };
        Some(match &obj.payload {
            Payload::Empty => Value::Null,
            Payload::Scalar(value) => value.clone(),
            Payload::List(items) => {
                let items = items
                    .iter()
                    .map(|addr| self.snapshot(*addr))
                    .collect::<Option<Vec<_>>>()?;
                if obj.ty.tag() == Some(TypeTag::Array) {
                    Value::Array(items)
                } else {
                    Value::List(items)
                }
            }
            Payload::Struct(fields) => Value::Struct(named(fields)?),
            Payload::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| Some((self.snapshot(*k)?, self.snapshot(*v)?)))
                    .collect::<Option<_>>()?,
            ),
            Payload::Node {
                id,
                label,
                properties,
            } => Value::Node(NodeSnapshot {
                id: self.snapshot_id(*id)?,
                label: self.snapshot_label(*label)?,
                properties: named(properties)?,
            }),
            Payload::Rel {
                id,
                src,
                dst,
                label,
                properties,
            } => Value::Rel(RelSnapshot {
                id: self.snapshot_id(*id)?,
                src: self.snapshot_id(*src)?,
                dst: self.snapshot_id(*dst)?,
                label: self.snapshot_label(*label)?,
                properties: named(properties)?,
            }),
            Payload::RecursiveRel { nodes, rels } => {
                let list = |addr: usize| match self.snapshot(addr)? {
                    Value::List(items) => Some(items),
                    _ => None,
                };
                Value::RecursiveRel {
                    nodes: list(*nodes)?,
                    rels: list(*rels)?,
                }
            }
        })
    }

    fn snapshot_id(&self, addr: usize) -> Option<InternalId> {
        match self.snapshot(addr)? {
            Value::InternalId(id) => Some(id),
            _ => None,
        }
    }

    fn snapshot_label(&self, addr: usize) -> Option<String> {
        match self.snapshot(addr)? {
            Value::String(label) => Some(label),
            _ => None,
        }
    }
}
