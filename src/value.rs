//! The wildcard value.
//!
//! [`Value`] fills slots whose concrete type is not known statically. When
//! marshalling, each `Value` is looked through at traversal time: scalars
//! become a single token, arrays and maps walk their elements, and a
//! [`Dyn`] payload is resolved through the atlas by its own type tag. When
//! unmarshalling, a `Value` destination only ever receives the natural
//! variants ([`Value::Map`], [`Value::Array`] and the scalars).
//!
//! ## Examples
//!
//! ```rust
//! use atlas_tok::{to_tokens, value, Atlas, Token, Value};
//!
//! let v = value!({ "id": 7, "tags": ["a"] });
//! let tokens = to_tokens(&Atlas::new(), &v).unwrap();
//! assert_eq!(tokens.len(), 8);
//! assert_eq!(tokens[2], Token::Int(7));
//! ```
//!
//! Heterogeneous payloads go through [`Dyn`]:
//!
//! ```rust
//! use atlas_tok::{to_tokens, Atlas, Token, Value};
//! use std::collections::BTreeMap;
//!
//! let mut scores = BTreeMap::new();
//! scores.insert("a".to_string(), 1u8);
//! let v = Value::Array(vec![Value::dynamic(scores), Value::from("x")]);
//! let tokens = to_tokens(&Atlas::new(), &v).unwrap();
//! assert_eq!(tokens[1], Token::MapOpen(Some(1)));
//! assert_eq!(tokens[3], Token::Uint(1));
//! ```

use crate::atlas::{AtlasEntry, Natural, Peeled, TypeRef, WildcardEntry};
use crate::map::Map;
use crate::token::Token;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A dynamically-typed value.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(Map),
    /// A concrete value carried with its own type tag.
    Dyn(Dyn),
}

/// A tagged dynamic payload: shared ownership of any value plus the
/// [`TypeRef`] the atlas resolves it by.
///
/// # Examples
///
/// ```rust
/// use atlas_tok::Dyn;
///
/// let d = Dyn::new(vec![1u8, 2]);
/// assert_eq!(d.downcast_ref::<Vec<u8>>(), Some(&vec![1, 2]));
/// assert_eq!(d.type_ref().name(), std::any::type_name::<Vec<u8>>());
/// ```
#[derive(Clone)]
pub struct Dyn {
    payload: Arc<dyn Any + Send + Sync>,
    ty: TypeRef,
}

impl Dyn {
    /// Wraps a value whose type has a natural mapping.
    pub fn new<T: Natural + Send + Sync>(value: T) -> Self {
        Dyn {
            payload: Arc::new(value),
            ty: TypeRef::natural::<T>(),
        }
    }

    /// Wraps a value that only resolves through a registered entry.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Dyn {
            payload: Arc::new(value),
            ty: TypeRef::of::<T>(),
        }
    }

    #[must_use]
    pub fn as_any(&self) -> &dyn Any {
        &*self.payload
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    #[must_use]
    pub fn type_ref(&self) -> TypeRef {
        self.ty
    }
}

/// Two `Dyn`s are equal only when they share the same payload.
impl PartialEq for Dyn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl fmt::Debug for Dyn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dyn({})", self.ty.name())
    }
}

impl Value {
    /// Shorthand for `Value::Dyn(Dyn::new(value))`.
    pub fn dynamic<T: Natural + Send + Sync>(value: T) -> Self {
        Value::Dyn(Dyn::new(value))
    }

    /// Builds the natural wildcard variant for a scalar token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Incompatible`] for structural tokens.
    pub fn from_scalar(token: Token) -> Result<Value> {
        Ok(match token {
            Token::Null => Value::Null,
            Token::Bool(b) => Value::Bool(b),
            Token::Int(i) => Value::Int(i),
            Token::Uint(u) => Value::Uint(u),
            Token::Float(f) => Value::Float(f),
            Token::String(s) => Value::String(s),
            Token::Bytes(b) => Value::Bytes(b),
            other => return Err(Error::incompatible("scalar", other.kind())),
        })
    }

    /// Looks through the wildcard to what the marshaller walks next.
    pub(crate) fn peel(&self) -> Peeled<'_> {
        match self {
            Value::Null => Peeled::Token(Token::Null),
            Value::Bool(b) => Peeled::Token(Token::Bool(*b)),
            Value::Int(i) => Peeled::Token(Token::Int(*i)),
            Value::Uint(u) => Peeled::Token(Token::Uint(*u)),
            Value::Float(f) => Peeled::Token(Token::Float(*f)),
            Value::String(s) => Peeled::Token(Token::String(s.clone())),
            Value::Bytes(b) => Peeled::Token(Token::Bytes(b.clone())),
            Value::Array(items) => Peeled::Value(items, TypeRef::natural::<Vec<Value>>()),
            Value::Map(map) => Peeled::Value(map, TypeRef::natural::<Map>()),
            Value::Dyn(d) => Peeled::Value(d.as_any(), d.type_ref()),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Returns `true` for `Int`, `Uint` and `Float`.
    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Uint(_) | Value::Float(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_dyn(&self) -> bool {
        matches!(self, Value::Dyn(_))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if it fits in an `i64`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::Value;
    ///
    /// assert_eq!(Value::Uint(42).as_i64(), Some(42));
    /// assert_eq!(Value::Uint(u64::MAX).as_i64(), None);
    /// assert_eq!(Value::Float(1.0).as_i64(), None);
    /// ```
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Uint(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(i) => u64::try_from(*i).ok(),
            Value::Uint(u) => Some(*u),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Uint(u) => Some(*u as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_dyn(&self) -> Option<&Dyn> {
        match self {
            Value::Dyn(d) => Some(d),
            _ => None,
        }
    }
}

fn peel_value(v: &dyn Any) -> Option<Peeled<'_>> {
    v.downcast_ref::<Value>().map(Value::peel)
}

fn scalar_value(token: Token) -> Result<Box<dyn Any>> {
    Value::from_scalar(token).map(|v| Box::new(v) as Box<dyn Any>)
}

fn wrap_value(built: Box<dyn Any>) -> Result<Box<dyn Any>> {
    let built = match built.downcast::<Map>() {
        Ok(map) => return Ok(Box::new(Value::Map(*map))),
        Err(other) => other,
    };
    match built.downcast::<Vec<Value>>() {
        Ok(items) => Ok(Box::new(Value::Array(*items))),
        Err(_) => Err(Error::entry_mismatch::<Value>()),
    }
}

impl Natural for Value {
    fn natural() -> AtlasEntry {
        AtlasEntry::wildcard::<Value>(WildcardEntry {
            peel: peel_value,
            map: TypeRef::natural::<Map>(),
            seq: TypeRef::natural::<Vec<Value>>(),
            scalar: scalar_value,
            wrap: wrap_value,
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Uint(u) => write!(f, "{}", u),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "bytes[{}]", b.len()),
            Value::Array(items) => {
                write!(
                    f,
                    "[{}]",
                    items
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(",")
                )
            }
            Value::Map(map) => {
                write!(
                    f,
                    "{{{}}}",
                    map.iter()
                        .map(|(k, v)| format!("{:?}:{}", k, v))
                        .collect::<Vec<_>>()
                        .join(",")
                )
            }
            Value::Dyn(d) => write!(f, "<{}>", d.type_ref().name()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Uint(u) => serializer.serialize_u64(*u),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Array(items) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for element in items {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                use serde::ser::SerializeMap;
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Dyn(d) => Err(serde::ser::Error::custom(format!(
                "dynamic {} has no serde form; convert it with to_value first",
                d.type_ref().name()
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any value")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Value, E> {
                Ok(Value::Int(value))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Value, E> {
                Ok(i64::try_from(value).map_or(Value::Uint(value), Value::Int))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Value, E> {
                Ok(Value::Float(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Value, E> {
                Ok(Value::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Value, E> {
                Ok(Value::String(value))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> std::result::Result<Value, E> {
                Ok(Value::Bytes(value.to_vec()))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> std::result::Result<Value, E> {
                Ok(Value::Bytes(value))
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    items.push(elem);
                }
                Ok(Value::Array(items))
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut map = Map::new();
                while let Some((key, value)) = access.next_entry()? {
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

macro_rules! value_from {
    ($variant:ident as $wide:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::$variant(<$wide>::from(value))
                }
            }
        )*
    };
}

value_from!(Int as i64: i8, i16, i32, i64);
value_from!(Uint as u64: u8, u16, u32, u64);
value_from!(Float as f64: f32, f64);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Map(value)
    }
}

impl From<Dyn> for Value {
    fn from(value: Dyn) -> Self {
        Value::Dyn(value)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}
