//! The wire-agnostic token vocabulary.
//!
//! A [`Token`] is one structural event: a scalar, the opening or closing of a
//! map or array, or a map key. Format encoders consume the tokens produced by
//! a [`Marshaller`](crate::Marshaller); format decoders produce the tokens an
//! [`Unmarshaller`](crate::Unmarshaller) consumes.
//!
//! ## Examples
//!
//! ```rust
//! use atlas_tok::{Token, TokenKind};
//!
//! let tok = Token::from("value");
//! assert_eq!(tok.kind(), TokenKind::String);
//! assert!(tok.is_scalar());
//! assert!(!Token::MapClose.is_scalar());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// One structural event in a token stream.
///
/// Open tokens carry an optional length hint. The marshaller always fills it
/// in; the unmarshaller never relies on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Token {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    MapOpen(Option<usize>),
    MapClose,
    ArrOpen(Option<usize>),
    ArrClose,
    Key(String),
}

/// The payload-free discriminant of a [`Token`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Null,
    Bool,
    Int,
    Uint,
    Float,
    String,
    Bytes,
    MapOpen,
    MapClose,
    ArrOpen,
    ArrClose,
    Key,
}

impl Token {
    /// Returns the kind of this token.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> TokenKind {
        match self {
            Token::Null => TokenKind::Null,
            Token::Bool(_) => TokenKind::Bool,
            Token::Int(_) => TokenKind::Int,
            Token::Uint(_) => TokenKind::Uint,
            Token::Float(_) => TokenKind::Float,
            Token::String(_) => TokenKind::String,
            Token::Bytes(_) => TokenKind::Bytes,
            Token::MapOpen(_) => TokenKind::MapOpen,
            Token::MapClose => TokenKind::MapClose,
            Token::ArrOpen(_) => TokenKind::ArrOpen,
            Token::ArrClose => TokenKind::ArrClose,
            Token::Key(_) => TokenKind::Key,
        }
    }

    /// Returns `true` for scalar tokens (everything except open, close and key).
    #[inline]
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        self.kind().is_scalar()
    }
}

impl TokenKind {
    #[inline]
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        !matches!(
            self,
            TokenKind::MapOpen
                | TokenKind::MapClose
                | TokenKind::ArrOpen
                | TokenKind::ArrClose
                | TokenKind::Key
        )
    }

    /// Returns a short lowercase name, used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TokenKind::Null => "null",
            TokenKind::Bool => "bool",
            TokenKind::Int => "int",
            TokenKind::Uint => "uint",
            TokenKind::Float => "float",
            TokenKind::String => "string",
            TokenKind::Bytes => "bytes",
            TokenKind::MapOpen => "map open",
            TokenKind::MapClose => "map close",
            TokenKind::ArrOpen => "array open",
            TokenKind::ArrClose => "array close",
            TokenKind::Key => "key",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Null => write!(f, "null"),
            Token::Bool(b) => write!(f, "{}", b),
            Token::Int(i) => write!(f, "{}", i),
            Token::Uint(u) => write!(f, "{}", u),
            Token::Float(fl) => write!(f, "{}", fl),
            Token::String(s) => write!(f, "{:?}", s),
            Token::Bytes(b) => write!(f, "bytes[{}]", b.len()),
            Token::MapOpen(Some(n)) => write!(f, "{{{}", n),
            Token::MapOpen(None) => write!(f, "{{"),
            Token::MapClose => write!(f, "}}"),
            Token::ArrOpen(Some(n)) => write!(f, "[{}", n),
            Token::ArrOpen(None) => write!(f, "["),
            Token::ArrClose => write!(f, "]"),
            Token::Key(k) => write!(f, "{:?}:", k),
        }
    }
}

impl From<bool> for Token {
    fn from(value: bool) -> Self {
        Token::Bool(value)
    }
}

impl From<i64> for Token {
    fn from(value: i64) -> Self {
        Token::Int(value)
    }
}

impl From<u64> for Token {
    fn from(value: u64) -> Self {
        Token::Uint(value)
    }
}

impl From<f64> for Token {
    fn from(value: f64) -> Self {
        Token::Float(value)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::String(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::String(value.to_string())
    }
}
