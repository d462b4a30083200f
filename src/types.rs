// Core data model: the document value tree, entries, and small validated
// wrapper types that enforce invariants at construction time rather than
// scattering checks through the store.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A document value: scalars, ordered sequences, and string-keyed mappings.
///
/// This is a tagged-variant tree rather than an opaque dynamic type, so
/// index type-checks become pattern matches instead of runtime type probes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// A float32 vector: every element of the sequence must be a number.
    pub fn as_vector(&self) -> Option<Vec<f32>> {
        match self {
            Value::Seq(items) => items
                .iter()
                .map(|v| match v {
                    Value::Float(f) => Some(*f as f32),
                    Value::Int(i) => Some(*i as f32),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    /// A comparable scalar for the ordered index. Mixed types never compare
    /// equal across kinds, so this just identifies the kind plus the value.
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Str(s) => Some(Scalar::Str(s.clone())),
            Value::Int(i) => Some(Scalar::Int(*i)),
            Value::Float(f) => Some(Scalar::Float(*f)),
            _ => None,
        }
    }
}

/// A scalar suitable for ordered-index storage. Comparisons are defined
/// only within a variant; cross-variant comparisons are never equal and
/// order arbitrarily (callers never see them because the ordered index
/// only stores one variant kind's worth of values per field in practice,
/// but the type itself does not enforce that — see ordered_index.rs).
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Scalar {
    Str(String),
    Int(i64),
    // f64 doesn't implement Eq/Ord; ordered_index.rs wraps comparisons
    // through partial_cmp and treats incomparable pairs (NaN) as unordered.
    Float(f64),
}

impl Eq for Scalar {}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// A value paired with creation time and TTL.
///
/// TTL=0 means no expiration. An entry is expired iff ttl_secs > 0 and
/// now > created_at + ttl_secs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entry {
    pub value: Value,
    pub created_at: u64,
    pub ttl_secs: u64,
}

impl Entry {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            created_at: now_secs(),
            ttl_secs: 0,
        }
    }

    pub fn with_ttl(value: Value, ttl_secs: u64) -> Self {
        Self {
            value,
            created_at: now_secs(),
            ttl_secs,
        }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        self.ttl_secs > 0 && now > self.created_at + self.ttl_secs
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_secs())
    }
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A non-empty UTF-8 document key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidatedKey {
    inner: String,
}

impl ValidatedKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(StoreError::InvalidKey("key cannot be empty".into()));
        }
        Ok(Self { inner: key })
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn into_string(self) -> String {
        self.inner
    }
}

impl fmt::Display for ValidatedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl AsRef<str> for ValidatedKey {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

/// The three pluggable index kinds, as named in `CreateIndex`/`RemoveIndex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Text,
    Vector,
    Ordered,
}

impl IndexType {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(IndexType::Text),
            "vector" => Ok(IndexType::Vector),
            "ordered" => Ok(IndexType::Ordered),
            other => Err(StoreError::UnknownIndexType(other.to_string())),
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndexType::Text => "text",
            IndexType::Vector => "vector",
            IndexType::Ordered => "ordered",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_expiry() {
        let e = Entry {
            value: Value::Null,
            created_at: 100,
            ttl_secs: 10,
        };
        assert!(!e.is_expired_at(109));
        assert!(!e.is_expired_at(110));
        assert!(e.is_expired_at(111));
    }

    #[test]
    fn entry_no_ttl_never_expires() {
        let e = Entry {
            value: Value::Null,
            created_at: 0,
            ttl_secs: 0,
        };
        assert!(!e.is_expired_at(u64::MAX));
    }

    #[test]
    fn validated_key_rejects_empty() {
        assert!(ValidatedKey::new("").is_err());
        assert!(ValidatedKey::new("a").is_ok());
    }

    #[test]
    fn index_type_parses_case_insensitively() {
        assert_eq!(IndexType::parse("Text").unwrap(), IndexType::Text);
        assert_eq!(IndexType::parse("VECTOR").unwrap(), IndexType::Vector);
        assert!(IndexType::parse("bogus").is_err());
    }

    #[test]
    fn value_as_vector_accepts_ints_and_floats() {
        let v = Value::Seq(vec![Value::Int(1), Value::Float(0.5)]);
        assert_eq!(v.as_vector(), Some(vec![1.0, 0.5]));
        assert_eq!(Value::Str("x".into()).as_vector(), None);
    }
}
