use std::sync::Arc;

use facet_core::{Facet, Field};
use facet_reflect::Partial;
use indexmap::IndexMap;

use crate::{
    DecodeError, Scalar, Values,
    cache::{FieldCache, FieldKind},
    context::ContextPool,
    custom::CustomRegistry,
    node,
    traverse::Traverser,
};

/// Whether untagged fields take part in decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Every field is decoded, under its tag name or else its field name.
    #[default]
    Implicit,
    /// Only fields with a tag name are decoded.
    Explicit,
}

/// Computes the external name of a field, replacing tag lookup entirely.
///
/// Returning `None` (or an empty string) means the field has no tag name.
pub type TagNameFn = dyn Fn(&Field) -> Option<String> + Send + Sync;

/// Every leaf value assigned during a decode, keyed by its path.
pub type Collected = IndexMap<String, Scalar>;

pub(crate) struct Config {
    pub(crate) mode: Mode,
    pub(crate) tag_name: String,
    pub(crate) tag_name_fn: Option<Arc<TagNameFn>>,
    pub(crate) max_array_size: usize,
    pub(crate) namespace_prefix: String,
    pub(crate) namespace_suffix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Implicit,
            tag_name: "form".to_owned(),
            tag_name_fn: None,
            max_array_size: 10_000,
            namespace_prefix: ".".to_owned(),
            namespace_suffix: String::new(),
        }
    }
}

/// Decodes flat form values into Facet types.
///
/// A decoder caches field metadata per type, so keep one around and reuse it.
/// Configuration takes `&mut self` and decoding takes `&self`, so a configured
/// decoder can be shared across threads.
///
/// `A` is an extra argument handed to every custom decode function, such as a
/// locale or a request-scoped lookup table.
pub struct Decoder<A = ()> {
    pub(crate) config: Config,
    pub(crate) cache: FieldCache,
    pub(crate) custom: CustomRegistry<A>,
    pool: ContextPool,
}

impl<A> Default for Decoder<A> {
    fn default() -> Self {
        Self {
            config: Config::default(),
            cache: FieldCache::default(),
            custom: CustomRegistry::default(),
            pool: ContextPool::default(),
        }
    }
}

impl<A> core::fmt::Debug for Decoder<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Decoder")
            .field("mode", &self.config.mode)
            .field("tag_name", &self.config.tag_name)
            .field("max_array_size", &self.config.max_array_size)
            .finish_non_exhaustive()
    }
}

impl<A> Decoder<A> {
    /// Creates a decoder with the default configuration: implicit mode, the
    /// `form` tag namespace, at most 10000 collection elements and `.`
    /// between nested field names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether untagged fields are decoded.
    pub fn set_mode(&mut self, mode: Mode) -> &mut Self {
        self.config.mode = mode;
        self.cache.clear();
        self
    }

    /// Sets the attribute namespace searched for `rename`, `form` by default.
    pub fn set_tag_name(&mut self, tag_name: impl Into<String>) -> &mut Self {
        self.config.tag_name = tag_name.into();
        self.cache.clear();
        self
    }

    /// Sets the largest collection the decoder will size from bracketed
    /// indices. Any index at or above it is reported as an error.
    pub fn set_max_array_size(&mut self, size: usize) -> &mut Self {
        self.config.max_array_size = size;
        self
    }

    /// Sets the text placed before a nested field name, `.` by default.
    pub fn set_namespace_prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.config.namespace_prefix = prefix.into();
        self
    }

    /// Sets the text placed after a nested field name, empty by default.
    pub fn set_namespace_suffix(&mut self, suffix: impl Into<String>) -> &mut Self {
        self.config.namespace_suffix = suffix.into();
        self
    }

    /// Replaces tag lookup with `f`.
    ///
    /// ```
    /// use facet::Facet;
    /// use facet_form::{Decoder, Values};
    ///
    /// #[derive(Facet, Debug, PartialEq)]
    /// struct Login {
    ///     user_name: String,
    /// }
    ///
    /// let mut decoder = Decoder::new();
    /// decoder.register_tag_name_fn(|field| Some(field.name.replace('_', "-")));
    /// let values: Values = [("user-name", "jane")].into_iter().collect();
    /// let login: Login = decoder.decode(&values, &()).unwrap();
    /// assert_eq!(login.user_name, "jane");
    /// ```
    pub fn register_tag_name_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Field) -> Option<String> + Send + Sync + 'static,
    {
        self.config.tag_name_fn = Some(Arc::new(f));
        self.cache.clear();
        self
    }

    /// Registers a function that decodes `T` from the raw value at its path.
    ///
    /// For record types the function only runs when a value exists at exactly
    /// the record's own path; otherwise the record is decoded field by field.
    pub fn register_fn<T, F, E>(&mut self, f: F) -> &mut Self
    where
        T: Facet<'static> + 'static,
        F: Fn(&str, &A) -> Result<T, E> + Send + Sync + 'static,
        E: core::fmt::Display,
    {
        self.custom.register::<T, F, E>(f);
        self
    }

    /// Decodes `values` into a new `T`.
    ///
    /// Every field error is collected before failing, so the returned
    /// [`DecodeError::Fields`] lists all of them.
    pub fn decode<T>(&self, values: &Values, arg: &A) -> Result<T, DecodeError>
    where
        T: Facet<'static>,
    {
        self.decode_inner(values, arg, None)
    }

    /// Like [`decode`](Self::decode), also recording every assigned leaf
    /// into `collected` under its path.
    pub fn decode_collect<T>(
        &self,
        values: &Values,
        arg: &A,
        collected: &mut Collected,
    ) -> Result<T, DecodeError>
    where
        T: Facet<'static>,
    {
        self.decode_inner(values, arg, Some(collected))
    }

    fn decode_inner<T>(
        &self,
        values: &Values,
        arg: &A,
        collected: Option<&mut Collected>,
    ) -> Result<T, DecodeError>
    where
        T: Facet<'static>,
    {
        let shape = T::SHAPE;
        if FieldKind::of(shape) == FieldKind::Reference {
            return Err(DecodeError::InvalidTarget { shape });
        }

        let mut ctx = self.pool.acquire();
        let tree = Traverser::new(self, values, arg, &mut ctx, collected).root(shape);
        let errors = ctx.errors.take();
        self.pool.release(ctx);

        if !errors.is_empty() {
            tracing::debug!(%shape, errors = errors.len(), "decode failed");
            return Err(DecodeError::Fields(errors));
        }

        let wip = Partial::alloc_owned::<T>().map_err(|err| DecodeError::Build {
            message: err.to_string(),
        })?;
        let wip = node::build(wip, tree)?;
        wip.build()?
            .materialize::<T>()
            .map_err(|err| DecodeError::Build {
                message: err.to_string(),
            })
    }
}
