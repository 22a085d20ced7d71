//! Open-ended field storage for elements that have no typed property.
//!
//! A [`Bag`] keeps insertion order so that exported field maps follow the
//! order of the source document.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// A value stored in a [`Bag`]: a scalar, a list, or a nested bag.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Map(Bag),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Bag> {
        match self {
            FieldValue::Map(bag) => Some(bag),
            _ => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

impl From<Bag> for FieldValue {
    fn from(value: Bag) -> Self {
        FieldValue::Map(value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::List(items) => items.serialize(serializer),
            FieldValue::Map(bag) => bag.serialize(serializer),
        }
    }
}

/// Ordered map from field name to [`FieldValue`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bag {
    entries: Vec<(String, FieldValue)>,
}

impl Bag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. A replaced entry keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Append to a list entry, creating it if needed. An existing scalar is
    /// promoted to a list.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, FieldValue::List(items))) => items.push(value),
            Some((_, slot)) => {
                let previous = std::mem::replace(slot, FieldValue::List(Vec::new()));
                let mut items = match previous {
                    FieldValue::Text(s) => vec![s],
                    _ => Vec::new(),
                };
                items.push(value);
                *slot = FieldValue::List(items);
            }
            None => self.entries.push((key, FieldValue::List(vec![value]))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_text)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Copy entries from `other` whose keys are not present yet.
    pub fn merge_missing(&mut self, other: &Bag) {
        for (key, value) in other.iter() {
            if !self.contains_key(key) {
                self.entries.push((key.to_string(), value.clone()));
            }
        }
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Bag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Bag::new();
        for (k, v) in iter {
            bag.insert(k, v);
        }
        bag
    }
}

impl Serialize for Bag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_order_and_replaces_in_place() {
        let mut bag = Bag::new();
        bag.insert("b", "1");
        bag.insert("a", "2");
        assert_eq!(bag.insert("b", "3"), Some(FieldValue::Text("1".into())));
        assert_eq!(bag.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(bag.get_text("b"), Some("3"));
    }

    #[test]
    fn push_promotes_scalar_to_list() {
        let mut bag = Bag::new();
        bag.insert("links", "x");
        bag.push("links", "y");
        bag.push("images", "z");
        assert_eq!(
            bag.get("links").and_then(FieldValue::as_list),
            Some(&["x".to_string(), "y".to_string()][..])
        );
        assert_eq!(bag.get("images").and_then(FieldValue::as_list).map(|l| l.len()), Some(1));
    }

    #[test]
    fn serializes_as_ordered_json_object() {
        let mut nested = Bag::new();
        nested.insert("w", "10");
        let mut bag = Bag::new();
        bag.insert("z", "last");
        bag.insert("m", nested);
        let json = serde_json::to_string(&bag).unwrap();
        assert_eq!(json, r#"{"z":"last","m":{"w":"10"}}"#);
    }

    #[test]
    fn merge_missing_never_overwrites() {
        let mut a: Bag = [("title", "typed")].into_iter().collect();
        let b: Bag = [("title", "bag"), ("guid", "g")].into_iter().collect();
        a.merge_missing(&b);
        assert_eq!(a.get_text("title"), Some("typed"));
        assert_eq!(a.get_text("guid"), Some("g"));
    }
}
