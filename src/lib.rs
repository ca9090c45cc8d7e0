//! # atlas_tok
//!
//! Step-wise transcoding between in-memory values and a wire-agnostic token
//! stream.
//!
//! ## What is it?
//!
//! A [`Marshaller`] turns a value into a sequence of [`Token`]s, one token
//! per call; an [`Unmarshaller`] rebuilds a value from such a sequence, one
//! token per call. Concrete formats (JSON, CBOR, MessagePack, ...) live on
//! either side of the token stream and drive the engines at their own pace,
//! interleaving steps with their own I/O.
//!
//! How each type decomposes is described by an [`AtlasEntry`], looked up in
//! a frozen [`Atlas`]. Common shapes have built-in ("natural") entries
//! through the [`Natural`] trait; anything else is registered explicitly.
//!
//! ## Key Features
//!
//! - **Resumable**: Both engines keep an explicit frame stack, so nesting
//!   depth never touches the call stack
//! - **Wildcards**: [`Value`] slots are resolved per element at traversal
//!   time, so heterogeneous containers marshal by each element's runtime type
//! - **Overridable**: Registered entries win over natural ones, for
//!   renaming, omission rules or custom scalar encodings
//! - **No Unsafe Code**: Destinations are rebuilt bottom-up in safe Rust
//!
//! ## Quick Start
//!
//! ```rust
//! use atlas_tok::{from_tokens, to_tokens, Atlas, AtlasEntry, Natural, Token};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     active: bool,
//! }
//!
//! impl Natural for User {
//!     fn natural() -> AtlasEntry {
//!         AtlasEntry::record::<User>()
//!             .field("id", |u| &u.id, |u, v| u.id = v)
//!             .field("name", |u| &u.name, |u, v| u.name = v)
//!             .field("active", |u| &u.active, |u, v| u.active = v)
//!             .build()
//!     }
//! }
//!
//! let atlas = Atlas::new();
//! let user = User { id: 123, name: "Alice".to_string(), active: true };
//!
//! let tokens = to_tokens(&atlas, &user).unwrap();
//! assert_eq!(tokens[0], Token::MapOpen(Some(3)));
//!
//! let back: User = from_tokens(&atlas, tokens).unwrap();
//! assert_eq!(user, back);
//! ```
//!
//! ### Stepping by Hand
//!
//! ```rust
//! use atlas_tok::{Atlas, Error, Marshaller, Token};
//!
//! let atlas = Atlas::new();
//! let s = String::from("value");
//! let mut m = Marshaller::new(&atlas);
//! m.bind(&s).unwrap();
//! assert_eq!(m.step().unwrap(), (Token::from("value"), true));
//! assert_eq!(m.step(), Err(Error::Overshoot));
//! ```
//!
//! ### Dynamic Values with the value! Macro
//!
//! ```rust
//! use atlas_tok::{from_value, value, Atlas};
//! use std::collections::BTreeMap;
//!
//! let v = value!({ "a": 1, "b": 2 });
//! let m: BTreeMap<String, i32> = from_value(&Atlas::new(), &v).unwrap();
//! assert_eq!(m["b"], 2);
//! ```
//!
//! ## Concurrency
//!
//! An [`Atlas`] is immutable once built and can be shared across threads;
//! each engine instance is single-threaded and owns its frame stack.
//!
//! ## Logging
//!
//! The engines emit [`tracing`] events: `debug` on bind and completion,
//! `trace` on every frame push and pop. Errors are returned, never logged.

pub mod atlas;
pub mod error;
mod frame;
pub mod macros;
pub mod map;
pub mod marshal;
pub mod options;
pub mod pump;
pub mod token;
pub mod unmarshal;
pub mod value;

pub use atlas::{Atlas, AtlasBuilder, AtlasEntry, Natural, RecordBuilder, ScalarValue, Shape, TypeRef};
pub use error::{Error, ErrorCategory, Result};
pub use map::Map;
pub use marshal::Marshaller;
pub use options::{Options, UnknownKeys, DEFAULT_MAX_DEPTH};
pub use pump::{pump_marshal, pump_unmarshal, TokenSink, TokenSource};
pub use token::{Token, TokenKind};
pub use unmarshal::{Slot, Unmarshaller};
pub use value::{Dyn, Value};

/// Marshals `value` into a token vector.
///
/// # Examples
///
/// ```rust
/// use atlas_tok::{to_tokens, Atlas, Token};
///
/// let tokens = to_tokens(&Atlas::new(), &Some(vec![true])).unwrap();
/// assert_eq!(
///     tokens,
///     vec![Token::ArrOpen(Some(1)), Token::Bool(true), Token::ArrClose]
/// );
/// ```
///
/// # Errors
///
/// Returns an error if any type on the way cannot be resolved.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_tokens<T: Natural>(atlas: &Atlas, value: &T) -> Result<Vec<Token>> {
    let mut marshaller = Marshaller::new(atlas);
    marshaller.bind(value)?;
    let mut tokens = Vec::new();
    pump_marshal(&mut marshaller, &mut tokens)?;
    Ok(tokens)
}

/// Unmarshals a complete token sequence into a fresh `T`.
///
/// # Errors
///
/// Returns an error if the tokens do not fit `T`, run out early
/// ([`Error::UnexpectedEnd`]) or continue past the value
/// ([`Error::Overshoot`]).
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_tokens<T, I>(atlas: &Atlas, tokens: I) -> Result<T>
where
    T: Natural + Default,
    I: IntoIterator<Item = Token>,
{
    let mut value = T::default();
    let mut source = tokens.into_iter();
    {
        let mut unmarshaller = Unmarshaller::new(atlas);
        unmarshaller.bind(&mut value)?;
        pump_unmarshal(&mut unmarshaller, &mut source)?;
    }
    match source.next() {
        Some(_) => Err(Error::Overshoot),
        None => Ok(value),
    }
}

/// Converts between two types by running a marshaller straight into an
/// unmarshaller, token by token, without buffering the stream.
///
/// # Examples
///
/// ```rust
/// use atlas_tok::{transcode, Atlas};
/// use std::collections::VecDeque;
///
/// let q: VecDeque<u8> = transcode(&Atlas::new(), &vec![1u8, 2]).unwrap();
/// assert_eq!(q, VecDeque::from(vec![1, 2]));
/// ```
///
/// # Errors
///
/// Returns the first error raised by either engine.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn transcode<S, D>(atlas: &Atlas, value: &S) -> Result<D>
where
    S: Natural,
    D: Natural + Default,
{
    let mut out = D::default();
    {
        let mut marshaller = Marshaller::new(atlas);
        marshaller.bind(value)?;
        let mut unmarshaller = Unmarshaller::new(atlas);
        unmarshaller.bind(&mut out)?;
        loop {
            let (token, done) = marshaller.step()?;
            let filled = unmarshaller.step(token)?;
            if done {
                if !filled {
                    return Err(Error::UnexpectedEnd);
                }
                break;
            }
        }
    }
    Ok(out)
}

/// Converts any naturally mapped value into a wildcard [`Value`].
///
/// # Examples
///
/// ```rust
/// use atlas_tok::{to_value, Atlas, Value};
///
/// let v = to_value(&Atlas::new(), &vec![Some(1i64), None]).unwrap();
/// assert_eq!(v, Value::Array(vec![Value::Int(1), Value::Null]));
/// ```
///
/// # Errors
///
/// Returns an error if any type on the way cannot be resolved.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_value<T: Natural>(atlas: &Atlas, value: &T) -> Result<Value> {
    transcode(atlas, value)
}

/// Converts a wildcard [`Value`] into a concrete `T`.
///
/// # Errors
///
/// Returns an error if the value's shape does not fit `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_value<T: Natural + Default>(atlas: &Atlas, value: &Value) -> Result<T> {
    transcode(atlas, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl Natural for Point {
        fn natural() -> AtlasEntry {
            AtlasEntry::record::<Point>()
                .field("x", |p| &p.x, |p, v| p.x = v)
                .field("y", |p| &p.y, |p, v| p.y = v)
                .build()
        }
    }

    #[test]
    fn test_tokens_round_trip_point() {
        let atlas = Atlas::new();
        let point = Point { x: 1, y: -2 };
        let tokens = to_tokens(&atlas, &point).unwrap();
        assert_eq!(tokens.len(), 6);
        let back: Point = from_tokens(&atlas, tokens).unwrap();
        assert_eq!(point, back);
    }

    #[test]
    fn test_from_tokens_trailing() {
        let atlas = Atlas::new();
        let err = from_tokens::<i32, _>(&atlas, vec![Token::Int(1), Token::Int(2)]).unwrap_err();
        assert_eq!(err, Error::Overshoot);
        let err = from_tokens::<Vec<i32>, _>(&atlas, vec![Token::ArrOpen(None)]).unwrap_err();
        assert_eq!(err, Error::UnexpectedEnd);
    }

    #[test]
    fn test_to_value_record() {
        let atlas = Atlas::new();
        let value = to_value(&atlas, &Point { x: 1, y: 2 }).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("x"), Some(&Value::Int(1)));
        assert_eq!(map.get("y"), Some(&Value::Int(2)));
        assert_eq!(from_value::<Point>(&atlas, &value).unwrap(), Point { x: 1, y: 2 });
    }

    #[test]
    fn test_from_value_shape_mismatch() {
        let atlas = Atlas::new();
        let err = from_value::<Vec<String>>(&atlas, &Value::from("x")).unwrap_err();
        assert_eq!(err, Error::incompatible("array open", TokenKind::String));
    }
}
