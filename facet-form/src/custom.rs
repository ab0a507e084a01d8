//! Per-type custom decode functions.

use std::collections::HashMap;
use std::sync::Arc;

use facet_core::{ConstTypeId, Facet, Shape};
use facet_reflect::{Partial, ReflectError};

/// A decoded value waiting to be written into its frame.
pub(crate) type Assign = Box<
    dyn FnOnce(Partial<'static, false>) -> Result<Partial<'static, false>, ReflectError>,
>;

type Handler<A> = Arc<dyn Fn(&str, &A) -> Result<Assign, String> + Send + Sync>;

/// Custom decode functions keyed by the type they produce.
///
/// Populated while configuring the decoder, read-only while decoding.
pub(crate) struct CustomRegistry<A> {
    handlers: HashMap<ConstTypeId, Handler<A>>,
}

impl<A> Default for CustomRegistry<A> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<A> CustomRegistry<A> {
    pub(crate) fn register<T, F, E>(&mut self, f: F)
    where
        T: Facet<'static> + 'static,
        F: Fn(&str, &A) -> Result<T, E> + Send + Sync + 'static,
        E: core::fmt::Display,
    {
        let handler: Handler<A> = Arc::new(move |raw: &str, arg: &A| match f(raw, arg) {
            Ok(value) => {
                let assign: Assign = Box::new(move |wip| wip.set(value));
                Ok(assign)
            }
            Err(err) => Err(err.to_string()),
        });
        tracing::debug!(shape = %T::SHAPE, "registered custom decode function");
        self.handlers.insert(T::SHAPE.id, handler);
    }

    pub(crate) fn get(&self, shape: &'static Shape) -> Option<&Handler<A>> {
        self.handlers.get(&shape.id)
    }

    pub(crate) fn contains(&self, shape: &'static Shape) -> bool {
        self.handlers.contains_key(&shape.id)
    }
}
