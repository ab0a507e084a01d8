//! Discovery of bracketed indices and map keys in the flat input.
//!
//! Every key is scanned once per decode. Each balanced top-level bracket group
//! `alias[token]` contributes `token` to the record for `alias`, so
//! `A[0][1].B` yields `0` under `A` and `1` under `A[0]`.

use std::collections::HashMap;

use crate::Values;

/// One bracket token found under some alias.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct IndexKey {
    /// The token between the brackets, verbatim.
    pub(crate) raw: String,
    /// The token as an index, when it is one.
    pub(crate) index: Option<usize>,
    /// The full key up to and including the closing bracket.
    pub(crate) search: String,
}

/// All distinct tokens found directly under one alias.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct IndexRecord {
    pub(crate) alias: String,
    /// One past the largest numeric token, saturating.
    pub(crate) max_len: usize,
    pub(crate) keys: Vec<IndexKey>,
}

impl IndexRecord {
    fn reset(&mut self, alias: &str) {
        self.alias.clear();
        self.alias.push_str(alias);
        self.max_len = 0;
        self.keys.clear();
    }

    fn insert(&mut self, raw: &str, search: &str) {
        if self.keys.iter().any(|k| k.raw == raw) {
            return;
        }
        let index = raw.parse::<usize>().ok();
        if let Some(i) = index {
            self.max_len = self.max_len.max(i.saturating_add(1));
        }
        self.keys.push(IndexKey {
            raw: raw.to_owned(),
            index,
            search: search.to_owned(),
        });
    }
}

/// Lazily-populated index records for one decode call.
///
/// Records beyond `active` are spare buffers kept from earlier decodes.
#[derive(Debug, Default)]
pub(crate) struct IndexCollector {
    records: Vec<IndexRecord>,
    active: usize,
    by_alias: HashMap<String, usize>,
    /// Key positions in `Values`, ordered by key.
    sorted: Vec<usize>,
    scanned: bool,
}

impl IndexCollector {
    pub(crate) fn clear(&mut self) {
        self.active = 0;
        self.by_alias.clear();
        self.sorted.clear();
        self.scanned = false;
    }

    /// Whether any key in `values` starts with `prefix`.
    ///
    /// Keys sharing a prefix are contiguous in sorted order, so one binary
    /// search answers it.
    pub(crate) fn has_prefix(&mut self, values: &Values, prefix: &str) -> bool {
        if !self.scanned {
            self.scan(values);
        }
        let pos = self
            .sorted
            .partition_point(|&i| values.key_at(i).is_some_and(|k| k < prefix));
        self.sorted
            .get(pos)
            .and_then(|&i| values.key_at(i))
            .is_some_and(|k| k.starts_with(prefix))
    }

    /// The record for `alias`, scanning `values` on first use.
    pub(crate) fn record_for(&mut self, values: &Values, alias: &str) -> Option<&IndexRecord> {
        if !self.scanned {
            self.scan(values);
        }
        let pos = *self.by_alias.get(alias)?;
        self.records.get(pos)
    }

    fn scan(&mut self, values: &Values) {
        self.scanned = true;
        self.sorted.clear();
        self.sorted.extend(0..values.len());
        self.sorted.sort_unstable_by_key(|&i| values.key_at(i));
        for key in values.keys() {
            if !balanced(key) {
                tracing::trace!(key, "ignoring key with unbalanced brackets");
                continue;
            }
            let mut depth = 0usize;
            let mut open = 0usize;
            for (i, b) in key.bytes().enumerate() {
                match b {
                    b'[' => {
                        if depth == 0 {
                            open = i;
                        }
                        depth += 1;
                    }
                    b']' => {
                        depth -= 1;
                        if depth == 0 {
                            self.insert(&key[..open], &key[open + 1..i], &key[..=i]);
                        }
                    }
                    _ => {}
                }
            }
        }
        tracing::trace!(aliases = self.active, "scanned index records");
    }

    fn insert(&mut self, alias: &str, raw: &str, search: &str) {
        let pos = match self.by_alias.get(alias) {
            Some(&pos) => pos,
            None => {
                let pos = self.active;
                if pos == self.records.len() {
                    self.records.push(IndexRecord::default());
                }
                self.records[pos].reset(alias);
                self.active += 1;
                self.by_alias.insert(alias.to_owned(), pos);
                pos
            }
        };
        self.records[pos].insert(raw, search);
    }
}

fn balanced(key: &str) -> bool {
    let mut depth = 0usize;
    for b in key.bytes() {
        match b {
            b'[' => depth += 1,
            b']' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raws(record: &IndexRecord) -> Vec<&str> {
        record.keys.iter().map(|k| k.raw.as_str()).collect()
    }

    #[test]
    fn sparse_indices_size_the_record() {
        let values: Values = [("A[2]", "y"), ("A[0]", "x"), ("A[2]", "z")]
            .into_iter()
            .collect();
        let mut collector = IndexCollector::default();
        let record = collector.record_for(&values, "A").unwrap();
        assert_eq!(record.max_len, 3);
        assert_eq!(raws(record), ["2", "0"]);
        assert_eq!(record.keys[0].search, "A[2]");
        assert!(collector.record_for(&values, "B").is_none());
    }

    #[test]
    fn nested_groups_record_under_their_own_alias() {
        let values: Values = [("A[0][1].B", "x"), ("M[en].Title", "y")].into_iter().collect();
        let mut collector = IndexCollector::default();
        assert_eq!(raws(collector.record_for(&values, "A").unwrap()), ["0"]);
        let inner = collector.record_for(&values, "A[0]").unwrap();
        assert_eq!(raws(inner), ["1"]);
        assert_eq!(inner.max_len, 2);
        let map = collector.record_for(&values, "M").unwrap();
        assert_eq!(map.keys[0].index, None);
        assert_eq!(map.max_len, 0);
    }

    #[test]
    fn bracketed_map_keys_keep_inner_brackets() {
        let values: Values = [("M[a[b]]", "x")].into_iter().collect();
        let mut collector = IndexCollector::default();
        assert_eq!(raws(collector.record_for(&values, "M").unwrap()), ["a[b]"]);
    }

    #[test]
    fn prefix_lookup_uses_sorted_keys() {
        let values: Values = [
            ("b.x", "1"),
            ("Rows[1].Name", "x"),
            ("a", "2"),
            ("Rows[0].Name", "y"),
        ]
        .into_iter()
        .collect();
        let mut collector = IndexCollector::default();
        assert!(collector.has_prefix(&values, "Rows[1]"));
        assert!(collector.has_prefix(&values, "Rows"));
        assert!(collector.has_prefix(&values, "b."));
        assert!(!collector.has_prefix(&values, "Rows[2]"));
        assert!(!collector.has_prefix(&values, "c"));

        collector.clear();
        assert!(!collector.has_prefix(&Values::new(), "a"));
    }

    #[test]
    fn unbalanced_keys_are_ignored() {
        let values: Values = [("A[0", "x"), ("B]0[", "y"), ("C[1]]", "z")]
            .into_iter()
            .collect();
        let mut collector = IndexCollector::default();
        assert!(collector.record_for(&values, "A").is_none());
        assert!(collector.record_for(&values, "B").is_none());
        assert!(collector.record_for(&values, "C").is_none());
    }

    #[test]
    fn huge_index_saturates() {
        let key = format!("A[{}]", usize::MAX);
        let values: Values = [(key.as_str(), "x")].into_iter().collect();
        let mut collector = IndexCollector::default();
        assert_eq!(collector.record_for(&values, "A").unwrap().max_len, usize::MAX);
    }

    #[test]
    fn clear_reuses_buffers() {
        let first: Values = [("A[0]", "x"), ("B[1]", "y")].into_iter().collect();
        let second: Values = [("C[4]", "z")].into_iter().collect();
        let mut collector = IndexCollector::default();
        collector.record_for(&first, "A");
        collector.clear();
        assert!(collector.record_for(&second, "A").is_none());
        let record = collector.record_for(&second, "C").unwrap();
        assert_eq!(record.alias, "C");
        assert_eq!(record.max_len, 5);
        assert_eq!(collector.records.len(), 2);
    }
}
