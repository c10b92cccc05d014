//! Defines the tagged union that all decoded MMDB data resolves to, and
//! accessors per variant: a small enum that can hold any value the format
//! can produce, with a `Display` impl for debugging/printing.
//!
//! Map entries are kept as an ordered `Vec<(String, Value)>` rather than a
//! `HashMap`: the format never requires lookup by key faster than linear
//! scan, and preserving on-disk order makes output (and tests)
//! deterministic.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A decoded MMDB value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    /// Raw bytes, including the 128-bit unsigned integer tag (Uint128),
    /// which this reader never numerically decodes.
    Binary(Vec<u8>),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Int32(i32),
    Double(f64),
    Float(f32),
    Boolean(bool),
    Map(Vec<(String, Value)>),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Value::Uint16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Uint32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(m) => Some(m.as_slice()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a.as_slice()),
            _ => None,
        }
    }

    /// Keyed access into a `Map` value; `None` for any other variant or a
    /// missing key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Indexed access into an `Array` value.
    pub fn index(&self, idx: usize) -> Option<&Value> {
        self.as_array()?.get(idx)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
            Value::Uint16(v) => write!(f, "{}", v),
            Value::Uint32(v) => write!(f, "{}", v),
            Value::Uint64(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Binary payloads have no JSON representation, so they serialize as
/// `null`.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Binary(_) => serializer.serialize_none(),
            Value::Uint16(v) => serializer.serialize_u16(*v),
            Value::Uint32(v) => serializer.serialize_u32(*v),
            Value::Uint64(v) => serializer.serialize_u64(*v),
            Value::Int32(v) => serializer.serialize_i32(*v),
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::Float(v) => serializer.serialize_f32(*v),
            Value::Boolean(v) => serializer.serialize_bool(*v),
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Array(a) => {
                let mut seq = serializer.serialize_seq(Some(a.len()))?;
                for v in a {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
        }
    }
}

#[test]
fn test_accessors() {
    let v = Value::Map(vec![
        ("name".to_string(), Value::String("foo".to_string())),
        ("count".to_string(), Value::Uint32(3)),
    ]);
    assert_eq!(v.get("name").unwrap().as_string(), Some("foo"));
    assert_eq!(v.get("count").unwrap().as_u32(), Some(3));
    assert!(v.get("missing").is_none());
    assert!(v.as_array().is_none());
}

#[test]
fn test_array_index() {
    let v = Value::Array(vec![Value::Uint16(1), Value::Uint16(2)]);
    assert_eq!(v.index(0).unwrap().as_u16(), Some(1));
    assert_eq!(v.index(2), None);
}

#[test]
fn test_binary_serializes_to_null() {
    let v = Value::Binary(vec![1, 2, 3]);
    assert_eq!(serde_json::to_string(&v).unwrap(), "null");
}

#[test]
fn test_map_serializes_in_order() {
    let v = Value::Map(vec![
        ("b".to_string(), Value::Uint16(2)),
        ("a".to_string(), Value::Uint16(1)),
    ]);
    assert_eq!(serde_json::to_string(&v).unwrap(), r#"{"b":2,"a":1}"#);
}
