//! Insertion-ordered map for wildcard values.
//!
//! [`Map`] wraps an [`IndexMap`] so that a map built by the unmarshaller
//! marshals its keys back in the order they arrived.
//!
//! ## Examples
//!
//! ```rust
//! use atlas_tok::{Map, Value};
//!
//! let mut map = Map::new();
//! map.insert("name".to_string(), Value::from("Alice"));
//! map.insert("age".to_string(), Value::from(30));
//!
//! assert_eq!(map.len(), 2);
//! assert_eq!(map.get("name").and_then(|v| v.as_str()), Some("Alice"));
//! ```

use crate::atlas::{AtlasEntry, Natural};
use crate::Value;
use indexmap::IndexMap;
use std::collections::HashMap;

/// An ordered map of string keys to wildcard values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Map(IndexMap<String, Value>);

impl Map {
    /// Creates an empty `Map`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::Map;
    ///
    /// let map = Map::new();
    /// assert!(map.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Map(IndexMap::new())
    }

    /// Creates an empty `Map` with room for at least `capacity` entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::Map;
    ///
    /// let map = Map::with_capacity(10);
    /// assert_eq!(map.len(), 0);
    /// ```
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Map(IndexMap::with_capacity(capacity))
    }

    /// Inserts a key-value pair, returning the previous value for the key.
    ///
    /// A replaced key keeps its original position.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::{Map, Value};
    ///
    /// let mut map = Map::new();
    /// assert!(map.insert("key".to_string(), Value::from(42)).is_none());
    /// assert!(map.insert("key".to_string(), Value::from(43)).is_some());
    /// ```
    pub fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        self.0.insert(key, value)
    }

    /// Returns a reference to the value for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::{Map, Value};
    ///
    /// let mut map = Map::new();
    /// map.insert("retries".to_string(), Value::from(3));
    /// assert_eq!(map.get("retries").and_then(Value::as_i64), Some(3));
    /// assert!(map.get("missing").is_none());
    /// ```
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a mutable reference to the value for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::{Map, Value};
    ///
    /// let mut map = Map::new();
    /// map.insert("active".to_string(), Value::Bool(false));
    /// if let Some(v) = map.get_mut("active") {
    ///     *v = Value::Bool(true);
    /// }
    /// assert_eq!(map.get("active"), Some(&Value::Bool(true)));
    /// ```
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Removes a key, shifting later entries down to keep the order.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Returns `true` if the map holds `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::{Map, Value};
    ///
    /// let mut map = Map::new();
    /// map.insert("id".to_string(), Value::Null);
    /// assert!(map.contains_key("id"));
    /// assert!(!map.contains_key("name"));
    /// ```
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::{Map, Value};
    ///
    /// let mut map = Map::new();
    /// map.insert("a".to_string(), Value::from(1));
    /// map.insert("a".to_string(), Value::from(2));
    /// assert_eq!(map.len(), 1);
    /// ```
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map has no entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::{Map, Value};
    ///
    /// let mut map = Map::new();
    /// assert!(map.is_empty());
    /// map.insert("k".to_string(), Value::Null);
    /// assert!(!map.is_empty());
    /// ```
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the keys in insertion order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::{Map, Value};
    ///
    /// let mut map = Map::new();
    /// map.insert("zone".to_string(), Value::Null);
    /// map.insert("app".to_string(), Value::Null);
    /// let keys: Vec<&String> = map.keys().collect();
    /// assert_eq!(keys, ["zone", "app"]);
    /// ```
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.0.keys()
    }

    /// Iterates over the values in insertion order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::{Map, Value};
    ///
    /// let mut map = Map::new();
    /// map.insert("x".to_string(), Value::from(1));
    /// map.insert("y".to_string(), Value::from(2));
    /// let total: i64 = map.values().filter_map(Value::as_i64).sum();
    /// assert_eq!(total, 3);
    /// ```
    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.0.values()
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl Natural for Map {
    fn natural() -> AtlasEntry {
        AtlasEntry::map::<Map, Value, _, _>(
            |m| m.iter().map(|(k, v)| (k.clone(), v)).collect(),
            |m, k, v| {
                m.insert(k, v);
            },
        )
    }
}

impl From<HashMap<String, Value>> for Map {
    fn from(map: HashMap<String, Value>) -> Self {
        Map(map.into_iter().collect())
    }
}

impl From<Map> for HashMap<String, Value> {
    fn from(map: Map) -> Self {
        map.0.into_iter().collect()
    }
}

impl IntoIterator for Map {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Map {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Map {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Map(IndexMap::from_iter(iter))
    }
}
