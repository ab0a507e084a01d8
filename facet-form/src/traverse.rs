//! The structural walk over a target shape.
//!
//! The traverser follows the shape tree, extending the namespace as it goes
//! and looking up values, bracketed indices and custom decode functions at
//! each position. Every field error is recorded and the walk continues, so a
//! single pass reports all of them.

use std::collections::BTreeMap;

use facet_core::{Def, Shape, Type, UserType};

use crate::{
    Collected, Decoder, Scalar, Values,
    cache::FieldKind,
    context::DecodeContext,
    convert::{self, is_scalar_like},
    error::FieldError,
    node::Node,
};

/// A bracketed token copied out of the index collector.
struct Token {
    raw: String,
    index: Option<usize>,
    search: String,
}

pub(crate) struct Traverser<'a, A> {
    decoder: &'a Decoder<A>,
    values: &'a Values,
    arg: &'a A,
    ctx: &'a mut DecodeContext,
    collected: Option<&'a mut Collected>,
}

impl<'a, A> Traverser<'a, A> {
    pub(crate) fn new(
        decoder: &'a Decoder<A>,
        values: &'a Values,
        arg: &'a A,
        ctx: &'a mut DecodeContext,
        collected: Option<&'a mut Collected>,
    ) -> Self {
        Self {
            decoder,
            values,
            arg,
            ctx,
            collected,
        }
    }

    pub(crate) fn root(mut self, shape: &'static Shape) -> Node {
        tracing::trace!(%shape, keys = self.values.len(), "decoding");
        self.ctx.namespace.clear();
        self.value(shape, 0)
    }

    /// Decodes the position named by the current namespace. `idx` selects
    /// among multiple values submitted under the same key.
    fn value(&mut self, shape: &'static Shape, idx: usize) -> Node {
        self.value_of_kind(shape, FieldKind::of(shape), idx)
    }

    fn value_of_kind(&mut self, shape: &'static Shape, kind: FieldKind, idx: usize) -> Node {
        let values = self.values;
        let decoder = self.decoder;

        if let Some(handler) = decoder.custom.get(shape) {
            let raw = values
                .get(self.ctx.namespace.as_str())
                .and_then(|vals| vals.get(idx));
            if let Some(raw) = raw {
                return match handler(raw, self.arg) {
                    Ok(assign) => {
                        self.collect(Scalar::Raw(raw.clone()));
                        Node::Custom(assign)
                    }
                    Err(message) => {
                        self.error(FieldError::Custom { message });
                        Node::Zero
                    }
                };
            }
        }

        if kind_is_nested(kind) && !self.has_prefix() {
            return Node::Zero;
        }

        match kind {
            FieldKind::Scalar => self.scalar(shape, idx),
            FieldKind::Record => self.record(shape),
            FieldKind::Unit => Node::Zero,
            FieldKind::List => self.list(shape),
            FieldKind::Array => self.array(shape),
            FieldKind::Map => self.map(shape),
            FieldKind::Option => {
                let Def::Option(option) = shape.def else {
                    return Node::Zero;
                };
                match self.value(option.t, idx) {
                    Node::Zero => Node::Zero,
                    inner => Node::Some(Box::new(inner)),
                }
            }
            FieldKind::Pointer => {
                let Some(pointee) = (match shape.def {
                    Def::Pointer(pointer) => pointer.pointee(),
                    _ => None,
                }) else {
                    return Node::Zero;
                };
                match self.value(pointee, idx) {
                    Node::Zero => Node::Zero,
                    inner => Node::Pointer(Box::new(inner)),
                }
            }
            FieldKind::Enum => self.variant(shape, idx),
            FieldKind::Reference | FieldKind::Unsupported => {
                if values.contains_key(self.ctx.namespace.as_str()) {
                    self.error(FieldError::Unsupported { shape });
                }
                Node::Zero
            }
        }
    }

    fn scalar(&mut self, shape: &'static Shape, idx: usize) -> Node {
        let values = self.values;
        let Some(raw) = values
            .get(self.ctx.namespace.as_str())
            .and_then(|vals| vals.get(idx))
        else {
            return Node::Zero;
        };
        match convert::convert(shape, raw, self.ctx.namespace.as_str()) {
            Ok(Some(scalar)) => {
                self.collect(scalar.clone());
                Node::Scalar(scalar)
            }
            Ok(None) => Node::Zero,
            Err(err) => {
                self.error(err);
                Node::Zero
            }
        }
    }

    fn variant(&mut self, shape: &'static Shape, idx: usize) -> Node {
        let values = self.values;
        let Some(raw) = values
            .get(self.ctx.namespace.as_str())
            .and_then(|vals| vals.get(idx))
        else {
            return Node::Zero;
        };
        if raw.is_empty() {
            return Node::Zero;
        }
        let Type::User(UserType::Enum(en)) = &shape.ty else {
            return Node::Zero;
        };
        let found = en
            .variants
            .iter()
            .find(|v| v.data.fields.is_empty() && v.effective_name() == raw.as_str());
        match found {
            Some(v) => {
                self.collect(Scalar::Raw(raw.clone()));
                Node::Variant(v.effective_name())
            }
            None => {
                self.error(FieldError::UnknownVariant {
                    value: raw.clone(),
                    shape,
                });
                Node::Zero
            }
        }
    }

    fn record(&mut self, shape: &'static Shape) -> Node {
        let decoder = self.decoder;
        let entry = decoder.cache.resolve(shape, &decoder.config);
        let prefix = decoder.config.namespace_prefix.as_str();
        let suffix = decoder.config.namespace_suffix.as_str();

        let mut node = Node::Zero;
        for field in entry.fields.iter().filter(|f| !f.ambiguous) {
            let mark = self.ctx.namespace.mark();
            self.ctx.namespace.push_field(&field.name, prefix, suffix);
            let child = self.value_of_kind(field.shape, field.kind, 0);
            self.ctx.namespace.reset(mark);
            if !child.is_zero() {
                node.insert_at(&field.route, child);
            }
        }
        node
    }

    fn list(&mut self, shape: &'static Shape) -> Node {
        let Def::List(list) = shape.def else {
            return Node::Zero;
        };
        let elem = list.t();
        let mut items: Vec<Node> = Vec::new();

        if self.takes_plain_values(elem) {
            let count = self
                .values
                .get(self.ctx.namespace.as_str())
                .map_or(0, <[String]>::len);
            for i in 0..count {
                items.push(self.value(elem, i));
            }
        }

        if let Some((tokens, max_len)) = self.tokens() {
            let limit = self.decoder.config.max_array_size;
            if max_len > limit {
                self.error(FieldError::BoundExceeded {
                    len: max_len,
                    max: limit,
                });
            } else {
                if items.len() < max_len {
                    items.resize_with(max_len, || Node::Zero);
                }
                for token in tokens {
                    let Some(i) = token.index else {
                        tracing::trace!(key = token.search.as_str(), "non-numeric list index");
                        self.token_error(&token.raw, FieldError::InvalidSliceIndex {
                            raw: token.raw.clone(),
                        });
                        continue;
                    };
                    let child = self.element(elem, &token.raw);
                    let current = core::mem::replace(&mut items[i], Node::Zero);
                    items[i] = current.merge(child);
                }
            }
        }

        if items.is_empty() {
            Node::Zero
        } else {
            tracing::trace!(
                namespace = self.ctx.namespace.as_str(),
                len = items.len(),
                "sized list"
            );
            Node::List(items)
        }
    }

    fn array(&mut self, shape: &'static Shape) -> Node {
        let Def::Array(array) = shape.def else {
            return Node::Zero;
        };
        let (elem, len) = (array.t, array.n);
        let mut items = BTreeMap::new();

        if self.takes_plain_values(elem) {
            let count = self
                .values
                .get(self.ctx.namespace.as_str())
                .map_or(0, <[String]>::len);
            if count > len {
                self.error(FieldError::IndexOutOfBounds { index: len, len });
            }
            for i in 0..count.min(len) {
                let child = self.value(elem, i);
                if !child.is_zero() {
                    items.insert(i, child);
                }
            }
        }

        if let Some((tokens, _)) = self.tokens() {
            for token in tokens {
                let Some(i) = token.index else {
                    tracing::trace!(key = token.search.as_str(), "non-numeric array index");
                    self.token_error(&token.raw, FieldError::InvalidSliceIndex {
                        raw: token.raw.clone(),
                    });
                    continue;
                };
                if i >= len {
                    self.token_error(&token.raw, FieldError::IndexOutOfBounds { index: i, len });
                    continue;
                }
                let child = self.element(elem, &token.raw);
                let current = items.remove(&i).unwrap_or(Node::Zero);
                let merged = current.merge(child);
                if !merged.is_zero() {
                    items.insert(i, merged);
                }
            }
        }

        if items.is_empty() {
            Node::Zero
        } else {
            Node::Array(items)
        }
    }

    fn map(&mut self, shape: &'static Shape) -> Node {
        let Def::Map(map) = shape.def else {
            return Node::Zero;
        };
        let Some((tokens, _)) = self.tokens() else {
            return Node::Zero;
        };
        if !is_scalar_like(map.k) {
            self.error(FieldError::Unsupported { shape: map.k });
            return Node::Zero;
        }

        let mut entries = Vec::new();
        for token in tokens {
            let mark = self.ctx.namespace.mark();
            self.ctx.namespace.push_index(&token.raw);
            let key = convert::convert(map.k, &token.raw, self.ctx.namespace.as_str());
            let key = match key {
                Ok(Some(key)) => key,
                Ok(None) | Err(_) => {
                    self.error(FieldError::InvalidMapKey {
                        raw: token.raw.clone(),
                        shape: map.k,
                    });
                    self.ctx.namespace.reset(mark);
                    continue;
                }
            };
            let child = self.value(map.v, 0);
            self.ctx.namespace.reset(mark);
            if !child.is_zero() {
                entries.push((key, child));
            }
        }

        if entries.is_empty() {
            Node::Zero
        } else {
            Node::Map(entries)
        }
    }

    /// Decodes one collection element addressed as `namespace[raw]`.
    fn element(&mut self, elem: &'static Shape, raw: &str) -> Node {
        let mark = self.ctx.namespace.mark();
        self.ctx.namespace.push_index(raw);
        let child = self.value(elem, 0);
        self.ctx.namespace.reset(mark);
        child
    }

    /// Repeated values under the exact key fill a collection only when each
    /// of them can become an element on its own, possibly behind an `Option`
    /// or a smart pointer.
    fn takes_plain_values(&self, elem: &'static Shape) -> bool {
        let mut shape = elem;
        loop {
            if self.decoder.custom.contains(shape) {
                return true;
            }
            let inner = match (FieldKind::of(shape), shape.def) {
                (FieldKind::Option, Def::Option(option)) => Some(option.t),
                (FieldKind::Pointer, Def::Pointer(pointer)) => pointer.pointee(),
                (FieldKind::Enum, _) => return true,
                _ => None,
            };
            match inner {
                Some(inner) => shape = inner,
                None => return is_scalar_like(shape),
            }
        }
    }

    /// The bracketed tokens directly under the current namespace and the
    /// length their numeric tokens call for.
    fn tokens(&mut self) -> Option<(Vec<Token>, usize)> {
        let record = self
            .ctx
            .indices
            .record_for(self.values, self.ctx.namespace.as_str())?;
        let tokens = record
            .keys
            .iter()
            .map(|k| Token {
                raw: k.raw.clone(),
                index: k.index,
                search: k.search.clone(),
            })
            .collect();
        tracing::trace!(
            alias = record.alias.as_str(),
            tokens = record.keys.len(),
            max_len = record.max_len,
            "index record"
        );
        Some((tokens, record.max_len))
    }

    /// Whether any key lies beneath the current namespace.
    fn has_prefix(&mut self) -> bool {
        let ctx = &mut *self.ctx;
        let namespace = ctx.namespace.as_str();
        namespace.is_empty() || ctx.indices.has_prefix(self.values, namespace)
    }

    fn error(&mut self, error: FieldError) {
        self.ctx.errors.insert(self.ctx.namespace.as_str(), error);
    }

    /// Records an error against `namespace[raw]`, so each offending token
    /// keeps its own entry.
    fn token_error(&mut self, raw: &str, error: FieldError) {
        let mark = self.ctx.namespace.mark();
        self.ctx.namespace.push_index(raw);
        self.error(error);
        self.ctx.namespace.reset(mark);
    }

    fn collect(&mut self, scalar: Scalar) {
        if let Some(collected) = self.collected.as_deref_mut() {
            collected.insert(self.ctx.namespace.as_str().to_owned(), scalar);
        }
    }
}

/// Kinds that are decoded from keys beneath their own path.
fn kind_is_nested(kind: FieldKind) -> bool {
    matches!(
        kind,
        FieldKind::Record | FieldKind::List | FieldKind::Array | FieldKind::Map
    )
}
