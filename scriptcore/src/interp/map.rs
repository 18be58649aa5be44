//! Insertion-ordered (or key-sorted) string map backing records, JSON objects and maps

use indexmap::IndexMap;

use super::Value;

#[derive(Debug, Clone, Default)]
pub struct MapData {
    entries: IndexMap<String, Value>,
    /// Keep entries ordered by key (`sorted map`)
    sorted: bool,
}

impl MapData {
    pub fn new() -> Self {
        MapData::default()
    }

    pub fn sorted() -> Self {
        MapData {
            entries: IndexMap::new(),
            sorted: true,
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Lookup preferring an exact match, then ignoring ASCII case
    pub fn get_ci(&self, key: &str) -> Option<&Value> {
        self.get(key).or_else(|| {
            self.entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    /// Stored spelling of a key matched ignoring case
    pub fn key_ci(&self, key: &str) -> Option<&str> {
        match self.entries.get_key_value(key) {
            Some((k, _)) => Some(k.as_str()),
            None => self
                .entries
                .keys()
                .find(|k| k.eq_ignore_ascii_case(key))
                .map(String::as_str),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace; returns the previous value
    pub fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        if let Some(slot) = self.entries.get_mut(&key) {
            return Some(std::mem::replace(slot, value));
        }
        if self.sorted {
            let pos = self
                .entries
                .keys()
                .position(|k| k.as_str() > key.as_str())
                .unwrap_or(self.entries.len());
            self.entries.shift_insert(pos, key, value);
        } else {
            self.entries.insert(key, value);
        }
        None
    }

    /// Remove keeping the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

/// Key-set equality; order does not matter
impl PartialEq for MapData {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}
