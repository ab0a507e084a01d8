//! The flat multi-valued input mapping.

use indexmap::IndexMap;

/// Ordered mapping from flat keys (`"User.Tags[2]"`) to every value submitted
/// under that key.
///
/// Insertion order is preserved so that repeated keys keep the order in which
/// they appeared in the query string or form body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Values {
    inner: IndexMap<String, Vec<String>>,
}

impl Values {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `application/x-www-form-urlencoded` input.
    ///
    /// Repeated keys accumulate, so `a=1&a=2` yields `["1", "2"]` under `a`.
    /// A leading `?` is ignored.
    pub fn parse(input: &str) -> Self {
        let input = input.strip_prefix('?').unwrap_or(input);
        url::form_urlencoded::parse(input.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Appends `value` to the values stored under `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(key.into()).or_default().push(value.into());
    }

    /// Replaces every value stored under `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), vec![value.into()]);
    }

    /// Every value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.inner.get(key).map(Vec::as_slice)
    }

    /// The first value stored under `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)?.first().map(String::as_str)
    }

    /// Whether `key` is present, even with no values.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Iterates over every key in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Iterates over `(key, values)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// The key at insertion position `i`.
    pub(crate) fn key_at(&self, i: usize) -> Option<&str> {
        self.inner.get_index(i).map(|(k, _)| k.as_str())
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether there are no keys at all.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Values
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Values::new();
        for (k, v) in iter {
            values.add(k, v);
        }
        values
    }
}

impl<K, V> Extend<(K, V)> for Values
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.add(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_accumulate() {
        let values = Values::parse("?tag=a&name=x&tag=b");
        assert_eq!(values.len(), 2);
        assert_eq!(values.get("tag"), Some(&["a".to_string(), "b".to_string()][..]));
        assert_eq!(values.first("name"), Some("x"));
        assert_eq!(values.keys().collect::<Vec<_>>(), ["tag", "name"]);
    }

    #[test]
    fn parse_decodes_percent_and_plus() {
        let values = Values::parse("User.Name=Jane+Doe&Note=a%26b%5B0%5D");
        assert_eq!(values.first("User.Name"), Some("Jane Doe"));
        assert_eq!(values.first("Note"), Some("a&b[0]"));
    }

    #[test]
    fn set_replaces() {
        let mut values: Values = [("a", "1"), ("a", "2")].into_iter().collect();
        values.set("a", "3");
        assert_eq!(values.get("a"), Some(&["3".to_string()][..]));
        assert!(values.first("missing").is_none());
    }
}
