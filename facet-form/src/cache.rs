//! Per-type field metadata.
//!
//! The first decode of a record type resolves the external name of every
//! participating field, promotes the fields of flattened records into their
//! parent and settles name collisions. The result is cached by type identity
//! for the lifetime of the decoder.

use std::collections::HashMap;
use std::sync::Arc;

use facet_core::{
    Characteristic, ConstTypeId, Def, Field, KnownPointer, ScalarType, Shape, StructKind, Type,
    UserType,
};
use parking_lot::RwLock;

use crate::decoder::{Config, Mode};

/// How a shape is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    /// Converted from one string.
    Scalar,
    /// A struct or tuple addressed field by field.
    Record,
    /// A struct with no fields.
    Unit,
    /// A growable list, sized by the largest index seen.
    List,
    /// A fixed-size array.
    Array,
    /// Keyed by bracketed tokens.
    Map,
    /// `Option<T>`
    Option,
    /// `Box<T>`, `Arc<T>`, `Rc<T>`
    Pointer,
    /// An enum addressed by unit variant name.
    Enum,
    /// A borrowed or raw pointer, which cannot own decoded data.
    Reference,
    /// Anything else.
    Unsupported,
}

impl FieldKind {
    pub(crate) fn of(shape: &'static Shape) -> Self {
        match shape.scalar_type() {
            Some(ScalarType::Str) => return FieldKind::Reference,
            Some(ScalarType::Unit) => return FieldKind::Unit,
            Some(_) => return FieldKind::Scalar,
            None => {}
        }
        match shape.def {
            Def::Option(_) => return FieldKind::Option,
            Def::List(_) => return FieldKind::List,
            Def::Array(_) => return FieldKind::Array,
            Def::Map(_) => return FieldKind::Map,
            Def::Pointer(pointer) => {
                return match pointer.known {
                    Some(KnownPointer::Box | KnownPointer::Arc | KnownPointer::Rc)
                        if pointer.pointee().is_some() =>
                    {
                        FieldKind::Pointer
                    }
                    Some(KnownPointer::SharedReference | KnownPointer::ExclusiveReference) => {
                        FieldKind::Reference
                    }
                    _ if shape.is(Characteristic::FromStr) => FieldKind::Scalar,
                    _ => FieldKind::Unsupported,
                };
            }
            _ => {}
        }
        match &shape.ty {
            Type::User(UserType::Struct(st)) => match st.kind {
                StructKind::Unit => FieldKind::Unit,
                _ if st.fields.is_empty() => FieldKind::Unit,
                _ => FieldKind::Record,
            },
            Type::User(UserType::Enum(_)) => FieldKind::Enum,
            Type::Pointer(_) => FieldKind::Reference,
            _ if shape.is(Characteristic::FromStr) => FieldKind::Scalar,
            _ => FieldKind::Unsupported,
        }
    }
}

/// One participating field of a record, possibly promoted from a flattened
/// descendant.
#[derive(Debug, Clone)]
pub(crate) struct FieldDescriptor {
    /// The external name.
    pub(crate) name: String,
    /// Physical field indices from the record root down to this field.
    pub(crate) route: Vec<usize>,
    /// How many flattened records this field was promoted through.
    pub(crate) depth: usize,
    pub(crate) shape: &'static Shape,
    pub(crate) kind: FieldKind,
    /// Another field at the same depth claims the same name.
    pub(crate) ambiguous: bool,
}

/// The descriptors of one record type, promoted fields first.
#[derive(Debug, Default)]
pub(crate) struct RecordEntry {
    pub(crate) fields: Vec<FieldDescriptor>,
}

/// Record descriptors keyed by type identity.
#[derive(Debug, Default)]
pub(crate) struct FieldCache {
    entries: RwLock<HashMap<ConstTypeId, Arc<RecordEntry>>>,
}

impl FieldCache {
    /// Returns the descriptors of `shape`, building them on first use.
    pub(crate) fn resolve(&self, shape: &'static Shape, config: &Config) -> Arc<RecordEntry> {
        if let Some(entry) = self.entries.read().get(&shape.id) {
            return Arc::clone(entry);
        }

        let built = Arc::new(build_entry(shape, config));
        tracing::debug!(
            %shape,
            fields = built.fields.len(),
            "built field cache entry"
        );

        // another thread may have built the same entry meanwhile
        let mut entries = self.entries.write();
        Arc::clone(entries.entry(shape.id).or_insert(built))
    }

    pub(crate) fn clear(&mut self) {
        self.entries.get_mut().clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}

fn build_entry(shape: &'static Shape, config: &Config) -> RecordEntry {
    let mut fields = Vec::new();
    if let Type::User(UserType::Struct(st)) = &shape.ty {
        collect(st.fields, &[], 0, config, &mut fields);
    }
    settle_collisions(&mut fields);

    // deeper first: a direct path to an embedded field overrides promotion
    fields.sort_by(|a, b| b.depth.cmp(&a.depth));
    RecordEntry { fields }
}

fn collect(
    fields: &'static [Field],
    route: &[usize],
    depth: usize,
    config: &Config,
    out: &mut Vec<FieldDescriptor>,
) {
    for (i, field) in fields.iter().enumerate() {
        if field.should_skip_deserializing() {
            continue;
        }
        let tagged = tag(field, config);
        let tag_given = tagged.is_some();
        let name = external_name(tagged, field, config);
        if name.as_deref() == Some("-") {
            continue;
        }

        let shape = field.shape();
        let kind = FieldKind::of(shape);
        let mut field_route = route.to_vec();
        field_route.push(i);

        if field.is_flattened() {
            if kind != FieldKind::Record {
                tracing::trace!(field = field.name, "ignoring flattened non-record field");
                continue;
            }
            // a tagged flattened record is an ordinary named field
            if !tag_given
                && let Type::User(UserType::Struct(inner)) = &shape.ty
            {
                collect(inner.fields, &field_route, depth + 1, config, out);
            }
        }

        if let Some(name) = name {
            out.push(FieldDescriptor {
                name,
                route: field_route,
                depth,
                shape,
                kind,
                ambiguous: false,
            });
        }
    }
}

/// The name a field was explicitly given, by the tag-name function when one
/// is registered, otherwise by a rename attribute.
fn tag(field: &'static Field, config: &Config) -> Option<String> {
    match &config.tag_name_fn {
        Some(tag_name_fn) => tag_name_fn(field).filter(|name| !name.is_empty()),
        None => tagged_name(field, &config.tag_name).map(str::to_owned),
    }
}

/// Resolves the key a field is addressed by, `None` when it takes no part
/// under its own name.
fn external_name(
    tagged: Option<String>,
    field: &'static Field,
    config: &Config,
) -> Option<String> {
    match (tagged, config.mode) {
        (Some(name), _) => Some(name),
        (None, Mode::Implicit) => Some(field.name.to_owned()),
        (None, Mode::Explicit) => None,
    }
}

fn tagged_name(field: &'static Field, namespace: &str) -> Option<&'static str> {
    let ext = field.get_attr(Some(namespace), "rename");
    if let Some(crate::Attr::Rename(name)) = ext.and_then(|attr| attr.get_as::<crate::Attr>()) {
        return Some(*name);
    }
    if let Some(name) = ext.and_then(|attr| attr.get_as::<&'static str>()) {
        return Some(*name);
    }
    field.rename
}

/// The shallowest fields claiming a name dominate. Deeper ones are dropped
/// and a tie at the dominating depth makes every contender ambiguous.
fn settle_collisions(fields: &mut Vec<FieldDescriptor>) {
    let mut shallowest: HashMap<&str, (usize, usize)> = HashMap::new();
    for f in fields.iter() {
        let slot = shallowest.entry(f.name.as_str()).or_insert((f.depth, 0));
        if f.depth < slot.0 {
            *slot = (f.depth, 1);
        } else if f.depth == slot.0 {
            slot.1 += 1;
        }
    }
    let verdicts: Vec<(bool, bool)> = fields
        .iter()
        .map(|f| {
            let (depth, count) = shallowest[f.name.as_str()];
            (f.depth == depth, count > 1)
        })
        .collect();

    let mut verdicts = verdicts.into_iter();
    fields.retain_mut(|f| match verdicts.next() {
        Some((true, ambiguous)) => {
            if ambiguous {
                tracing::debug!(name = %f.name, depth = f.depth, "ambiguous field name");
            }
            f.ambiguous = ambiguous;
            true
        }
        _ => false,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet::Facet;
    use std::collections::BTreeMap;

    #[derive(Facet)]
    struct Inner {
        field: String,
        only_inner: u8,
    }

    #[derive(Facet)]
    struct Outer {
        #[facet(flatten)]
        inner: Inner,
        field: String,
        #[facet(skip, default)]
        skipped: u8,
    }

    #[derive(Facet)]
    struct Left {
        shared: String,
    }

    #[derive(Facet)]
    struct Right {
        shared: String,
    }

    #[derive(Facet)]
    struct Both {
        #[facet(flatten)]
        left: Left,
        #[facet(flatten)]
        right: Right,
    }

    fn shape<T: Facet<'static>>() -> &'static Shape {
        T::SHAPE
    }

    fn names(entry: &RecordEntry) -> Vec<(&str, usize, bool)> {
        entry
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.depth, f.ambiguous))
            .collect()
    }

    #[test]
    fn promotion_and_shadowing() {
        let cache = FieldCache::default();
        let entry = cache.resolve(Outer::SHAPE, &Config::default());
        assert_eq!(
            names(&entry),
            [("only_inner", 1, false), ("inner", 0, false), ("field", 0, false)]
        );
        assert_eq!(entry.fields[0].route, [0, 1]);
        assert_eq!(entry.fields[1].kind, FieldKind::Record);
    }

    #[derive(Facet)]
    struct Named {
        #[facet(flatten)]
        #[facet(rename = "In")]
        inner: Inner,
        field: String,
    }

    #[test]
    fn tagged_flattened_records_are_not_promoted() {
        let entry = build_entry(Named::SHAPE, &Config::default());
        assert_eq!(names(&entry), [("In", 0, false), ("field", 0, false)]);
        assert_eq!(entry.fields[0].kind, FieldKind::Record);
    }

    #[test]
    fn same_depth_collisions_are_ambiguous() {
        let cache = FieldCache::default();
        let entry = cache.resolve(Both::SHAPE, &Config::default());
        assert_eq!(
            names(&entry),
            [
                ("shared", 1, true),
                ("shared", 1, true),
                ("left", 0, false),
                ("right", 0, false)
            ]
        );
    }

    #[test]
    fn entries_are_shared() {
        let cache = FieldCache::default();
        let config = Config::default();
        let a = cache.resolve(Outer::SHAPE, &config);
        let b = cache.resolve(Outer::SHAPE, &config);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn explicit_mode_needs_a_tag() {
        let config = Config {
            mode: Mode::Explicit,
            tag_name_fn: Some(Arc::new(|field: &Field| {
                (field.name == "field").then(|| "Field".to_string())
            })),
            ..Config::default()
        };
        let entry = build_entry(Outer::SHAPE, &config);
        // the untagged flattened record still promotes its tagged fields
        assert_eq!(names(&entry), [("Field", 0, false)]);
        assert_eq!(entry.fields[0].route, [1]);
    }

    #[test]
    fn kinds() {
        assert_eq!(FieldKind::of(shape::<u32>()), FieldKind::Scalar);
        assert_eq!(FieldKind::of(shape::<String>()), FieldKind::Scalar);
        assert_eq!(FieldKind::of(shape::<Vec<u32>>()), FieldKind::List);
        assert_eq!(FieldKind::of(shape::<[u32; 3]>()), FieldKind::Array);
        assert_eq!(
            FieldKind::of(shape::<BTreeMap<String, u32>>()),
            FieldKind::Map
        );
        assert_eq!(FieldKind::of(shape::<Option<u32>>()), FieldKind::Option);
        assert_eq!(FieldKind::of(shape::<Box<Inner>>()), FieldKind::Pointer);
        assert_eq!(FieldKind::of(shape::<&'static str>()), FieldKind::Reference);
        assert_eq!(FieldKind::of(shape::<&'static Inner>()), FieldKind::Reference);
        assert_eq!(FieldKind::of(Inner::SHAPE), FieldKind::Record);
    }
}
