//! `object`: insertion-ordered, unique-keyed mapping from byte-string key
//! to [`Value`](crate::value::Value) (spec §3).
//!
//! A linear `Vec` of entries is the simplest structure that preserves
//! insertion order and is trivial to reason about for a teaching-scale
//! core; real scripts are small enough that O(n) lookup is not the
//! bottleneck this crate cares about.

use crate::bytestring::ByteString;
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    entries: Vec<(ByteString, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Object::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ByteString) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &ByteString) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &ByteString) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert, preserving the original position if `key` already exists
    /// (an update), or appending at the end (a fresh insertion).
    pub fn insert(&mut self, key: ByteString, value: Value) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Get-or-insert-null, used by `Reference::write` when a subscript path
    /// creates an intermediate object slot.
    pub fn get_or_insert_null_mut(&mut self, key: &ByteString) -> &mut Value {
        if let Some(pos) = self.entries.iter().position(|(k, _)| k == key) {
            &mut self.entries[pos].1
        } else {
            self.entries.push((key.clone(), Value::Null));
            &mut self.entries.last_mut().unwrap().1
        }
    }

    pub fn remove(&mut self, key: &ByteString) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ByteString, Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ByteString> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = &'a (ByteString, Value);
    type IntoIter = std::slice::Iter<'a, (ByteString, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut obj = Object::new();
        obj.insert(ByteString::from("b"), Value::Integer(2));
        obj.insert(ByteString::from("a"), Value::Integer(1));
        let keys: Vec<_> = obj.keys().map(|k| k.to_string_lossy().into_owned()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn update_preserves_position() {
        let mut obj = Object::new();
        obj.insert(ByteString::from("a"), Value::Integer(1));
        obj.insert(ByteString::from("b"), Value::Integer(2));
        obj.insert(ByteString::from("a"), Value::Integer(99));
        let keys: Vec<_> = obj.keys().map(|k| k.to_string_lossy().into_owned()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(obj.get(&ByteString::from("a")), Some(&Value::Integer(99)));
    }
}
