use parking_lot::Mutex;

use crate::{error::DecodeErrors, index::IndexCollector, namespace::Namespace};

const NAMESPACE_CAPACITY: usize = 64;
const MAX_IDLE: usize = 32;

/// Scratch state owned by one decode call.
#[derive(Debug)]
pub(crate) struct DecodeContext {
    pub(crate) namespace: Namespace,
    pub(crate) indices: IndexCollector,
    pub(crate) errors: DecodeErrors,
}

impl DecodeContext {
    fn new() -> Self {
        Self {
            namespace: Namespace::with_capacity(NAMESPACE_CAPACITY),
            indices: IndexCollector::default(),
            errors: DecodeErrors::default(),
        }
    }

    /// Truncates everything while keeping allocations.
    fn reset(&mut self) {
        self.namespace.clear();
        self.indices.clear();
        self.errors.clear();
    }
}

/// Idle decode contexts, handed out one per decode call.
#[derive(Debug, Default)]
pub(crate) struct ContextPool {
    idle: Mutex<Vec<DecodeContext>>,
}

impl ContextPool {
    pub(crate) fn acquire(&self) -> DecodeContext {
        match self.idle.lock().pop() {
            Some(ctx) => ctx,
            None => {
                tracing::trace!("allocating decode context");
                DecodeContext::new()
            }
        }
    }

    pub(crate) fn release(&self, mut ctx: DecodeContext) {
        ctx.reset();
        let mut idle = self.idle.lock();
        if idle.len() < MAX_IDLE {
            idle.push(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Values, error::FieldError};

    #[test]
    fn released_contexts_come_back_clean() {
        let pool = ContextPool::default();
        let mut ctx = pool.acquire();
        ctx.namespace.push_field("Leftover", ".", "");
        ctx.errors
            .insert("Leftover", FieldError::InvalidSliceIndex { raw: "x".into() });
        let values: Values = [("A[0]", "x")].into_iter().collect();
        assert!(ctx.indices.record_for(&values, "A").is_some());
        pool.release(ctx);

        let mut ctx = pool.acquire();
        assert_eq!(ctx.namespace.as_str(), "");
        assert!(ctx.errors.is_empty());
        let other = Values::new();
        assert!(ctx.indices.record_for(&other, "A").is_none());
        assert!(ctx.namespace.mark() == 0);
    }

    #[test]
    fn idle_list_is_capped() {
        let pool = ContextPool::default();
        let contexts: Vec<_> = (0..MAX_IDLE + 5).map(|_| pool.acquire()).collect();
        for ctx in contexts {
            pool.release(ctx);
        }
        assert_eq!(pool.idle.lock().len(), MAX_IDLE);
    }
}
