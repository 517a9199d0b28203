//! Row representation.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::Serialize;

use crate::value::Value;

/// One row: a column-keyed map of values.
///
/// Ordered storage keeps rendered statements deterministic when a row is
/// used as an insert or update payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Data(BTreeMap<String, Value>);

impl Data {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    /// Set a column, returning the previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(column.into(), value.into())
    }

    /// Remove a column.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.0.remove(column)
    }

    /// Raw access to a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Whether the row has a column named `column`.
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Column names, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate columns and values, in sorted column order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Text value of a column; `None` if absent or not text.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(Value::as_str)
    }

    /// Column rendered as a string; empty when absent or NULL.
    pub fn get_string(&self, column: &str) -> String {
        match self.0.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(v) => v.to_string(),
        }
    }

    /// Boolean value of a column. Integer 0/1 is accepted.
    pub fn get_bool(&self, column: &str) -> Option<bool> {
        self.0.get(column).and_then(Value::as_bool)
    }

    /// Integer value of a column. Numeric text is accepted.
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.0.get(column).and_then(Value::as_i64)
    }

    /// Float value of a column.
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.0.get(column).and_then(Value::as_f64)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Data {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, Value>> for Data {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Data> for BTreeMap<String, Value> {
    fn from(data: Data) -> Self {
        data.0
    }
}

impl IntoIterator for Data {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Data {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Data {
        Data::new()
            .with("title", "managers")
            .with("access_level", 5)
            .with("active", 1)
            .with("note", Value::Null)
    }

    #[test]
    fn test_typed_accessors() {
        let row = sample();
        assert_eq!(row.get_str("title"), Some("managers"));
        assert_eq!(row.get_i64("access_level"), Some(5));
        assert_eq!(row.get_bool("active"), Some(true));
        assert_eq!(row.get_f64("access_level"), Some(5.0));
        assert_eq!(row.get_str("access_level"), None);
    }

    #[test]
    fn test_get_string_defaults_to_empty() {
        let row = sample();
        assert_eq!(row.get_string("note"), "");
        assert_eq!(row.get_string("missing"), "");
        assert_eq!(row.get_string("access_level"), "5");
    }

    #[test]
    fn test_keys_are_sorted() {
        let keys: Vec<_> = sample().keys().map(str::to_string).collect();
        assert_eq!(keys, ["access_level", "active", "note", "title"]);
    }

    #[test]
    fn test_from_iter() {
        let row: Data = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(row.len(), 2);
        assert!(row.contains("b"));
    }
}
