use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single attribute value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String attribute. Key attributes are always strings.
    S(String),
    /// Unsigned numeric attribute (versions, counters).
    N(u64),
    /// Boolean attribute.
    Bool(bool),
}

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<u64> {
        match self {
            Self::N(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        Self::N(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Primary key of an item: partition key plus sort key.
///
/// Ordering is partition first, then sort key, which is also the order in
/// which queries return items.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub partition: String,
    pub sort: String,
}

impl ItemKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}|{}]", self.partition, self.sort)
    }
}

/// A stored record: a flat map of attribute names to values.
///
/// The store never interprets attributes other than the key attributes and
/// the version attribute named by the table schema.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    attributes: BTreeMap<String, AttributeValue>,
}

impl Item {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder-style setter that skips `None`.
    pub fn with_opt<V: Into<AttributeValue>>(
        self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// String attribute, or `None` if absent or of another type.
    pub fn get_s(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_s)
    }

    pub fn get_n(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(AttributeValue::as_n)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(AttributeValue::as_bool)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_check_type() {
        let item = Item::new()
            .with("name", "env")
            .with("version", 3u64)
            .with("valid", true);
        assert_eq!(item.get_s("name"), Some("env"));
        assert_eq!(item.get_n("version"), Some(3));
        assert_eq!(item.get_bool("valid"), Some(true));
        // Wrong type reads as absent.
        assert_eq!(item.get_s("version"), None);
        assert_eq!(item.get_n("missing"), None);
    }

    #[test]
    fn with_opt_skips_none() {
        let item = Item::new()
            .with_opt("present", Some("x"))
            .with_opt::<&str>("absent", None);
        assert_eq!(item.len(), 1);
        assert!(item.get("absent").is_none());
    }

    #[test]
    fn set_overwrites_and_remove_returns_previous() {
        let mut item = Item::new().with("a", 1u64);
        item.set("a", 2u64);
        assert_eq!(item.get_n("a"), Some(2));
        assert_eq!(item.remove("a"), Some(AttributeValue::N(2)));
        assert!(item.is_empty());
    }

    #[test]
    fn keys_order_partition_then_sort() {
        let mut keys = vec![
            ItemKey::new("b", "a"),
            ItemKey::new("a", "z"),
            ItemKey::new("a", "b"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ItemKey::new("a", "b"),
                ItemKey::new("a", "z"),
                ItemKey::new("b", "a"),
            ]
        );
    }

    #[test]
    fn key_display() {
        assert_eq!(ItemKey::new("acct#c", "env").to_string(), "[acct#c|env]");
    }
}
