//! Open property maps shared by vertices and edges.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single property value.
///
/// Floats compare and hash by bit pattern so that elements carrying them can live in
/// hashed sets (the adjacency index deduplicates edges by value).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PropertyValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Type name used in schema descriptions.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "BOOL",
            PropertyValue::Integer(_) => "INT64",
            PropertyValue::Float(_) => "DOUBLE",
            PropertyValue::String(_) => "STRING",
            PropertyValue::Bytes(_) => "BLOB",
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a == b,
            (PropertyValue::Integer(a), PropertyValue::Integer(b)) => a == b,
            (PropertyValue::Float(a), PropertyValue::Float(b)) => a.to_bits() == b.to_bits(),
            (PropertyValue::String(a), PropertyValue::String(b)) => a == b,
            (PropertyValue::Bytes(a), PropertyValue::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PropertyValue {}

impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            PropertyValue::Bool(b) => b.hash(state),
            PropertyValue::Integer(i) => i.hash(state),
            PropertyValue::Float(f) => f.to_bits().hash(state),
            PropertyValue::String(s) => s.hash(state),
            PropertyValue::Bytes(b) => b.hash(state),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(b: Vec<u8>) -> Self {
        PropertyValue::Bytes(b)
    }
}

/// Property map. Ordered so that equality and hashing do not depend on insertion order.
pub type Props = BTreeMap<String, PropertyValue>;

/// Build a [`Props`] map from key/value pairs.
pub fn props<K, V, I>(pairs: I) -> Props
where
    K: Into<String>,
    V: Into<PropertyValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Base contract of every graph element: an open property map.
///
/// Property mutation never touches identity (vid, or sid/tid for edges).
pub trait Elem {
    fn props(&self) -> &Props;

    fn props_mut(&mut self) -> &mut Props;

    fn get_prop(&self, key: &str) -> Option<&PropertyValue> {
        self.props().get(key)
    }

    fn set_prop(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.props_mut().insert(key.into(), value.into());
    }

    fn del_prop(&mut self, key: &str) -> Option<PropertyValue> {
        self.props_mut().remove(key)
    }

    /// True iff every key in `expected` maps to the same value; other keys are ignored.
    fn has_props(&self, expected: &Props) -> bool {
        expected
            .iter()
            .all(|(k, v)| self.props().get(k) == Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn float_values_hash_by_bits() {
        let mut set = HashSet::new();
        set.insert(PropertyValue::Float(f64::NAN));
        set.insert(PropertyValue::Float(f64::NAN));
        set.insert(PropertyValue::Float(1.5));
        assert_eq!(set.len(), 2);
        assert_ne!(PropertyValue::Integer(1), PropertyValue::Float(1.0));
    }

    #[test]
    fn untagged_json_keeps_variant() {
        let map = props([
            ("s", PropertyValue::from("x")),
            ("i", PropertyValue::from(3i64)),
            ("f", PropertyValue::from(0.5)),
            ("b", PropertyValue::from(true)),
        ]);
        let json = serde_json::to_string(&map).unwrap();
        let back: Props = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
        assert_eq!(back["i"].type_name(), "INT64");
        assert_eq!(back["f"].as_float(), Some(0.5));
    }

    #[test]
    fn display_is_plain_text() {
        assert_eq!(PropertyValue::from("rel").to_string(), "rel");
        assert_eq!(PropertyValue::from(7i64).to_string(), "7");
        assert_eq!(PropertyValue::from(vec![1u8, 2]).to_string(), "<2 bytes>");
    }
}
