/// The address of the current traversal position, built up in place.
///
/// Callers take a [`mark`](Self::mark) before descending and
/// [`reset`](Self::reset) to it afterwards, so a single buffer serves the
/// whole decode.
#[derive(Debug, Default)]
pub(crate) struct Namespace {
    buf: String,
}

impl Namespace {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.buf
    }

    pub(crate) fn mark(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn reset(&mut self, mark: usize) {
        self.buf.truncate(mark);
    }

    pub(crate) fn clear(&mut self) {
        self.buf.clear();
    }

    /// Appends a record field name. The very first segment is written bare.
    pub(crate) fn push_field(&mut self, name: &str, prefix: &str, suffix: &str) {
        if self.buf.is_empty() {
            self.buf.push_str(name);
        } else {
            self.buf.push_str(prefix);
            self.buf.push_str(name);
            self.buf.push_str(suffix);
        }
    }

    /// Appends a bracketed index or map key.
    pub(crate) fn push_index(&mut self, raw: &str) {
        self.buf.push('[');
        self.buf.push_str(raw);
        self.buf.push(']');
    }
}
