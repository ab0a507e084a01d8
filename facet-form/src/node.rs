//! The decoded value tree and its assembly into the target.
//!
//! Traversal produces a [`Node`] per position that received input. Building
//! replays the tree into a [`Partial`], giving every untouched position its
//! zero value.

use std::collections::BTreeMap;

use facet_core::{Characteristic, Def, Type, UserType};
use facet_reflect::{Partial, ReflectError, ReflectErrorKind};

use crate::{Scalar, cache::FieldKind, convert::is_scalar_like, custom::Assign};

type Wip = Partial<'static, false>;

pub(crate) enum Node {
    /// Nothing was decoded here.
    Zero,
    Scalar(Scalar),
    Custom(Assign),
    /// A unit variant, by effective name.
    Variant(&'static str),
    /// Decoded fields by physical index.
    Struct(BTreeMap<usize, Node>),
    Some(Box<Node>),
    Pointer(Box<Node>),
    List(Vec<Node>),
    Array(BTreeMap<usize, Node>),
    Map(Vec<(Scalar, Node)>),
}

impl core::fmt::Debug for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Node::Zero => f.write_str("Zero"),
            Node::Scalar(s) => f.debug_tuple("Scalar").field(s).finish(),
            Node::Custom(_) => f.write_str("Custom"),
            Node::Variant(name) => f.debug_tuple("Variant").field(name).finish(),
            Node::Struct(fields) => f.debug_tuple("Struct").field(fields).finish(),
            Node::Some(inner) => f.debug_tuple("Some").field(inner).finish(),
            Node::Pointer(inner) => f.debug_tuple("Pointer").field(inner).finish(),
            Node::List(items) => f.debug_tuple("List").field(items).finish(),
            Node::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Node::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
        }
    }
}

impl Node {
    pub(crate) fn is_zero(&self) -> bool {
        matches!(self, Node::Zero)
    }

    /// Combines two decodes of the same position. Values in `later` win.
    pub(crate) fn merge(self, later: Node) -> Node {
        match (self, later) {
            (earlier, Node::Zero) => earlier,
            (Node::Struct(mut a), Node::Struct(b)) => {
                merge_keyed(&mut a, b);
                Node::Struct(a)
            }
            (Node::Array(mut a), Node::Array(b)) => {
                merge_keyed(&mut a, b);
                Node::Array(a)
            }
            (Node::Some(a), Node::Some(b)) => Node::Some(Box::new(a.merge(*b))),
            (Node::Pointer(a), Node::Pointer(b)) => Node::Pointer(Box::new(a.merge(*b))),
            (Node::List(a), Node::List(b)) => {
                let len = a.len().max(b.len());
                let mut a = a.into_iter();
                let mut b = b.into_iter();
                let merged = (0..len)
                    .map(|_| {
                        let x = a.next().unwrap_or(Node::Zero);
                        let y = b.next().unwrap_or(Node::Zero);
                        x.merge(y)
                    })
                    .collect();
                Node::List(merged)
            }
            (Node::Map(mut a), Node::Map(b)) => {
                a.extend(b);
                Node::Map(a)
            }
            (_, later) => later,
        }
    }

    /// Merges `node` into the field reached by `route`.
    pub(crate) fn insert_at(&mut self, route: &[usize], node: Node) {
        let Some((&first, rest)) = route.split_first() else {
            let current = core::mem::replace(self, Node::Zero);
            *self = current.merge(node);
            return;
        };
        if !matches!(self, Node::Struct(_)) {
            *self = Node::Struct(BTreeMap::new());
        }
        if let Node::Struct(fields) = self {
            fields.entry(first).or_insert(Node::Zero).insert_at(rest, node);
        }
    }
}

fn merge_keyed(into: &mut BTreeMap<usize, Node>, from: BTreeMap<usize, Node>) {
    for (k, v) in from {
        let current = into.remove(&k).unwrap_or(Node::Zero);
        into.insert(k, current.merge(v));
    }
}

/// Writes `node` into the current frame of `wip`.
pub(crate) fn build(mut wip: Wip, node: Node) -> Result<Wip, ReflectError> {
    match node {
        Node::Zero => zero(wip),
        Node::Scalar(scalar) => scalar.assign(wip),
        Node::Custom(assign) => assign(wip),
        Node::Variant(name) => wip.select_variant_named(name),
        Node::Struct(mut fields) => {
            let Type::User(UserType::Struct(st)) = &wip.shape().ty else {
                return Err(wip.err(ReflectErrorKind::OperationFailed {
                    shape: wip.shape(),
                    operation: "expected a struct",
                }));
            };
            for (i, field) in st.fields.iter().enumerate() {
                match fields.remove(&i) {
                    Some(child) => {
                        wip = wip.begin_nth_field(i)?;
                        wip = build(wip, child)?;
                        wip = wip.end()?;
                    }
                    None if field.has_default() => {
                        wip = wip.set_nth_field_to_default(i)?;
                    }
                    None => {
                        wip = wip.begin_nth_field(i)?;
                        wip = zero(wip)?;
                        wip = wip.end()?;
                    }
                }
            }
            Ok(wip)
        }
        Node::Some(inner) => {
            wip = wip.begin_some()?;
            wip = build(wip, *inner)?;
            wip.end()
        }
        Node::Pointer(inner) => {
            wip = wip.begin_smart_ptr()?;
            wip = build(wip, *inner)?;
            wip.end()
        }
        Node::List(items) => {
            wip = wip.init_list()?;
            for item in items {
                wip = wip.begin_list_item()?;
                wip = build(wip, item)?;
                wip = wip.end()?;
            }
            Ok(wip)
        }
        Node::Array(mut items) => {
            let Def::Array(array) = wip.shape().def else {
                return Err(wip.err(ReflectErrorKind::OperationFailed {
                    shape: wip.shape(),
                    operation: "expected an array",
                }));
            };
            wip = wip.init_array()?;
            for i in 0..array.n {
                wip = wip.begin_nth_field(i)?;
                wip = build(wip, items.remove(&i).unwrap_or(Node::Zero))?;
                wip = wip.end()?;
            }
            Ok(wip)
        }
        Node::Map(entries) => {
            wip = wip.init_map()?;
            for (key, value) in entries {
                wip = wip.begin_key()?;
                wip = key.assign(wip)?;
                wip = wip.end()?;
                wip = wip.begin_value()?;
                wip = build(wip, value)?;
                wip = wip.end()?;
            }
            Ok(wip)
        }
    }
}

/// Fills the current frame with its zero value: `Default` where the type has
/// it, the parse of an empty string for text-parsed scalars, otherwise built
/// up from the zero values of its parts.
fn zero(wip: Wip) -> Result<Wip, ReflectError> {
    let shape = wip.shape();
    if shape.is(Characteristic::Default) {
        return wip.set_default();
    }
    if shape.is(Characteristic::FromStr) && is_scalar_like(shape) {
        return wip.parse_from_str("");
    }
    match FieldKind::of(shape) {
        FieldKind::Record | FieldKind::Unit => build(wip, Node::Struct(BTreeMap::new())),
        FieldKind::Array => build(wip, Node::Array(BTreeMap::new())),
        FieldKind::Pointer => build(wip, Node::Pointer(Box::new(Node::Zero))),
        _ => Err(wip.err(ReflectErrorKind::OperationFailed {
            shape,
            operation: "type has no zero value; implement Default or supply a value",
        })),
    }
}
