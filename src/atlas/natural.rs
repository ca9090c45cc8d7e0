//! Natural mappings: the default entries a type gets without registration.
//!
//! [`Natural`] is implemented here for the common shapes: scalars, `Option`
//! and `Box` indirections, `Vec`/`VecDeque` sequences and string-keyed maps.
//! Record types opt in by implementing it themselves, returning an entry
//! built with [`AtlasEntry::record`].
//!
//! ## Numeric coercion
//!
//! Integer destinations accept both [`Token::Int`] and [`Token::Uint`] as long
//! as the value fits; floats additionally accept either integer token.
//! Anything lossy on the integer side is an [`Error::Coercion`].

use super::AtlasEntry;
use crate::token::{Token, TokenKind};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use num_bigint::BigInt;
use std::any::Any;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// A type with a built-in mapping to tokens.
///
/// # Examples
///
/// ```rust
/// use atlas_tok::{to_tokens, Atlas, AtlasEntry, Natural, Token};
///
/// #[derive(Default)]
/// struct Point { x: i64, y: i64 }
///
/// impl Natural for Point {
///     fn natural() -> AtlasEntry {
///         AtlasEntry::record::<Point>()
///             .field("x", |p| &p.x, |p, v| p.x = v)
///             .field("y", |p| &p.y, |p, v| p.y = v)
///             .build()
///     }
/// }
///
/// let tokens = to_tokens(&Atlas::new(), &Point { x: 1, y: 2 }).unwrap();
/// assert_eq!(tokens[0], Token::MapOpen(Some(2)));
/// assert_eq!(tokens.len(), 6);
/// ```
pub trait Natural: Any {
    fn natural() -> AtlasEntry;
}

/// A type that is exactly one scalar token.
pub trait ScalarValue: Any + Sized {
    /// Describes the accepted tokens in incompatibility reports.
    const EXPECTED: &'static str;

    fn to_token(&self) -> Token;

    fn from_token(token: Token) -> Result<Self>;
}

fn mismatch(expected: &'static str, token: &Token) -> Error {
    Error::incompatible(expected, token.kind())
}

macro_rules! signed_scalar {
    ($($t:ty),*) => {
        $(
            impl ScalarValue for $t {
                const EXPECTED: &'static str = "integer";

                fn to_token(&self) -> Token {
                    Token::Int(*self as i64)
                }

                fn from_token(token: Token) -> Result<Self> {
                    match token {
                        Token::Int(i) => <$t>::try_from(i).map_err(|_| Error::coercion(i, stringify!($t))),
                        Token::Uint(u) => <$t>::try_from(u).map_err(|_| Error::coercion(u, stringify!($t))),
                        other => Err(mismatch(Self::EXPECTED, &other)),
                    }
                }
            }
        )*
    };
}

macro_rules! unsigned_scalar {
    ($($t:ty),*) => {
        $(
            impl ScalarValue for $t {
                const EXPECTED: &'static str = "integer";

                fn to_token(&self) -> Token {
                    Token::Uint(*self as u64)
                }

                fn from_token(token: Token) -> Result<Self> {
                    match token {
                        Token::Int(i) => <$t>::try_from(i).map_err(|_| Error::coercion(i, stringify!($t))),
                        Token::Uint(u) => <$t>::try_from(u).map_err(|_| Error::coercion(u, stringify!($t))),
                        other => Err(mismatch(Self::EXPECTED, &other)),
                    }
                }
            }
        )*
    };
}

signed_scalar!(i8, i16, i32, i64, isize);
unsigned_scalar!(u8, u16, u32, u64, usize);

impl ScalarValue for f64 {
    const EXPECTED: &'static str = "number";

    fn to_token(&self) -> Token {
        Token::Float(*self)
    }

    fn from_token(token: Token) -> Result<Self> {
        match token {
            Token::Float(f) => Ok(f),
            Token::Int(i) => Ok(i as f64),
            Token::Uint(u) => Ok(u as f64),
            other => Err(mismatch(Self::EXPECTED, &other)),
        }
    }
}

impl ScalarValue for f32 {
    const EXPECTED: &'static str = "number";

    fn to_token(&self) -> Token {
        Token::Float(f64::from(*self))
    }

    fn from_token(token: Token) -> Result<Self> {
        f64::from_token(token).map(|f| f as f32)
    }
}

impl ScalarValue for bool {
    const EXPECTED: &'static str = "bool";

    fn to_token(&self) -> Token {
        Token::Bool(*self)
    }

    fn from_token(token: Token) -> Result<Self> {
        match token {
            Token::Bool(b) => Ok(b),
            other => Err(mismatch(Self::EXPECTED, &other)),
        }
    }
}

impl ScalarValue for String {
    const EXPECTED: &'static str = "string";

    fn to_token(&self) -> Token {
        Token::String(self.clone())
    }

    fn from_token(token: Token) -> Result<Self> {
        match token {
            Token::String(s) => Ok(s),
            other => Err(mismatch(Self::EXPECTED, &other)),
        }
    }
}

impl ScalarValue for char {
    const EXPECTED: &'static str = "string";

    fn to_token(&self) -> Token {
        Token::String(self.to_string())
    }

    fn from_token(token: Token) -> Result<Self> {
        let s = String::from_token(token)?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::coercion(format!("{:?}", s), "char")),
        }
    }
}

/// Raw bytes travel as a single [`Token::Bytes`].
impl ScalarValue for Vec<u8> {
    const EXPECTED: &'static str = "bytes";

    fn to_token(&self) -> Token {
        Token::Bytes(self.clone())
    }

    fn from_token(token: Token) -> Result<Self> {
        match token {
            Token::Bytes(b) => Ok(b),
            other => Err(mismatch(Self::EXPECTED, &other)),
        }
    }
}

impl ScalarValue for () {
    const EXPECTED: &'static str = "null";

    fn to_token(&self) -> Token {
        Token::Null
    }

    fn from_token(token: Token) -> Result<Self> {
        match token.kind() {
            TokenKind::Null => Ok(()),
            _ => Err(mismatch(Self::EXPECTED, &token)),
        }
    }
}

macro_rules! natural_scalar {
    ($($t:ty),*) => {
        $(
            impl Natural for $t {
                fn natural() -> AtlasEntry {
                    AtlasEntry::scalar::<$t>()
                }
            }
        )*
    };
}

natural_scalar!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, char, String, ());

/// `None` travels as a single [`Token::Null`].
///
/// Nested options collapse: `Some(None)` also marshals to `Null`, which
/// unmarshals as the outer `None`.
impl<T: Natural> Natural for Option<T> {
    fn natural() -> AtlasEntry {
        AtlasEntry::option::<T>()
    }
}

impl<T: Natural> Natural for Box<T> {
    fn natural() -> AtlasEntry {
        AtlasEntry::boxed::<T>()
    }
}

impl<T: Natural> Natural for Vec<T> {
    fn natural() -> AtlasEntry {
        AtlasEntry::sequence::<Vec<T>, T, _, _, _>(|v| v.len(), |v, i| v.get(i), |v, x| v.push(x))
    }
}

impl<T: Natural> Natural for VecDeque<T> {
    fn natural() -> AtlasEntry {
        AtlasEntry::sequence::<VecDeque<T>, T, _, _, _>(
            |v| v.len(),
            |v, i| v.get(i),
            |v, x| v.push_back(x),
        )
    }
}

impl<T: Natural> Natural for BTreeMap<String, T> {
    fn natural() -> AtlasEntry {
        AtlasEntry::map::<BTreeMap<String, T>, T, _, _>(
            |m| m.iter().map(|(k, v)| (k.clone(), v)).collect(),
            |m, k, v| {
                m.insert(k, v);
            },
        )
    }
}

/// Keys are emitted in sorted order so the stream does not depend on the
/// hasher.
impl<T: Natural> Natural for HashMap<String, T> {
    fn natural() -> AtlasEntry {
        AtlasEntry::map::<HashMap<String, T>, T, _, _>(
            |m| {
                let mut entries: Vec<_> = m.iter().map(|(k, v)| (k.clone(), v)).collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                entries
            },
            |m, k, v| {
                m.insert(k, v);
            },
        )
    }
}

impl<T: Natural> Natural for IndexMap<String, T> {
    fn natural() -> AtlasEntry {
        AtlasEntry::map::<IndexMap<String, T>, T, _, _>(
            |m| m.iter().map(|(k, v)| (k.clone(), v)).collect(),
            |m, k, v| {
                m.insert(k, v);
            },
        )
    }
}

/// RFC 3339 string.
impl Natural for DateTime<Utc> {
    fn natural() -> AtlasEntry {
        AtlasEntry::transform::<DateTime<Utc>, String, _, _>(
            |dt| Ok(dt.to_rfc3339()),
            |s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| Error::coercion(s, "DateTime<Utc>"))
            },
        )
    }
}

/// Decimal string, so values past 64 bits survive any token codec.
impl Natural for BigInt {
    fn natural() -> AtlasEntry {
        AtlasEntry::transform::<BigInt, String, _, _>(
            |n| Ok(n.to_string()),
            |s| s.parse::<BigInt>().map_err(|_| Error::coercion(s, "BigInt")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::Shape;
    use crate::{from_tokens, to_tokens, Atlas};

    #[test]
    fn test_nested_option_collapses() {
        let atlas = Atlas::new();
        let nested: Option<Option<u8>> = Some(None);
        let tokens = to_tokens(&atlas, &nested).unwrap();
        assert_eq!(tokens, vec![Token::Null]);
        let back: Option<Option<u8>> = from_tokens(&atlas, tokens).unwrap();
        assert_eq!(back, None);

        let full: Option<Option<u8>> = Some(Some(3));
        let back: Option<Option<u8>> =
            from_tokens(&atlas, to_tokens(&atlas, &full).unwrap()).unwrap();
        assert_eq!(back, full);
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(i32::from_token(Token::Uint(7)).unwrap(), 7);
        assert_eq!(u8::from_token(Token::Int(255)).unwrap(), 255);
        assert_eq!(
            u8::from_token(Token::Int(256)).unwrap_err(),
            Error::coercion(256, "u8")
        );
        assert_eq!(
            u32::from_token(Token::Int(-1)).unwrap_err(),
            Error::coercion(-1, "u32")
        );
    }

    #[test]
    fn test_float_widening() {
        assert_eq!(f64::from_token(Token::Int(-3)).unwrap(), -3.0);
        assert_eq!(f64::from_token(Token::Uint(3)).unwrap(), 3.0);
        assert_eq!(f32::from_token(Token::Float(1.5)).unwrap(), 1.5);
    }

    #[test]
    fn test_scalar_kind_mismatch() {
        let err = i64::from_token(Token::String("1".into())).unwrap_err();
        assert_eq!(err, Error::incompatible("integer", TokenKind::String));
        let err = String::from_token(Token::MapOpen(None)).unwrap_err();
        assert_eq!(err, Error::incompatible("string", TokenKind::MapOpen));
    }

    #[test]
    fn test_char_requires_single_char() {
        assert_eq!(char::from_token(Token::from("x")).unwrap(), 'x');
        assert!(matches!(
            char::from_token(Token::from("xy")),
            Err(Error::Coercion { .. })
        ));
    }

    #[test]
    fn test_natural_shapes() {
        assert_eq!(<i64 as Natural>::natural().shape(), Shape::Scalar);
        assert_eq!(<Vec<String> as Natural>::natural().shape(), Shape::Sequence);
        assert_eq!(<Option<u8> as Natural>::natural().shape(), Shape::Optional);
        assert_eq!(<Box<u8> as Natural>::natural().shape(), Shape::Optional);
        assert_eq!(
            <HashMap<String, bool> as Natural>::natural().shape(),
            Shape::Map
        );
        assert_eq!(<DateTime<Utc> as Natural>::natural().shape(), Shape::Scalar);
    }

    #[test]
    fn test_bigint_transform() {
        let entry = <BigInt as Natural>::natural();
        let crate::atlas::EntryKind::Scalar(scalar) = &entry.kind else {
            panic!("expected scalar");
        };
        let n: BigInt = "123456789012345678901234567890".parse().unwrap();
        let tok = (scalar.encode)(&n).unwrap();
        assert_eq!(tok, Token::from("123456789012345678901234567890"));
        let back = (scalar.decode)(tok).unwrap();
        assert_eq!(back.downcast_ref::<BigInt>(), Some(&n));
    }
}
