//! Named-field records

use super::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single tabular record: variable name → value
///
/// Fields iterate in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Insert or replace a field, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Numeric value of a field (None when absent or not a number)
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_number)
    }

    /// Category level of a field (None when absent or not a category)
    pub fn category(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_category)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Copy of this record with a single field replaced
    pub fn replaced(&self, name: &str, value: Value) -> Record {
        let mut copy = self.clone();
        copy.fields.insert(name.to_string(), value);
        copy
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaced_leaves_original_untouched() {
        let record = Record::new().with("age", 40.0).with("gender", "female");
        let probe = record.replaced("age", Value::from(65.0));

        assert_eq!(record.number("age"), Some(40.0));
        assert_eq!(probe.number("age"), Some(65.0));
        assert_eq!(probe.category("gender"), Some("female"));
    }

    #[test]
    fn test_names_are_sorted() {
        let record: Record = vec![("z", 1.0), ("a", 2.0), ("m", 3.0)].into_iter().collect();
        let names: Vec<&str> = record.names().collect();
        assert_eq!(names, vec!["a", "m", "z"]);
    }
}
