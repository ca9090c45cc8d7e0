//! Drive an engine to completion against a token sink or source.
//!
//! Format codecs sit on the far side of these traits: an encoder is a
//! [`TokenSink`], a decoder is a [`TokenSource`].
//!
//! ## Examples
//!
//! ```rust
//! use atlas_tok::{pump_marshal, pump_unmarshal, Atlas, Marshaller, Unmarshaller};
//!
//! let atlas = Atlas::new();
//! let src = vec!["a".to_string(), "b".to_string()];
//!
//! let mut m = Marshaller::new(&atlas);
//! m.bind(&src).unwrap();
//! let mut tokens = Vec::new();
//! pump_marshal(&mut m, &mut tokens).unwrap();
//!
//! let mut dest: Vec<String> = Vec::new();
//! let mut u = Unmarshaller::new(&atlas);
//! u.bind(&mut dest).unwrap();
//! pump_unmarshal(&mut u, &mut tokens.into_iter()).unwrap();
//! drop(u);
//! assert_eq!(dest, src);
//! ```

use crate::marshal::Marshaller;
use crate::token::Token;
use crate::unmarshal::Unmarshaller;
use crate::{Error, Result};

/// Receives tokens from a marshaller.
pub trait TokenSink {
    /// # Errors
    ///
    /// Implementations report their own failures, usually as
    /// [`Error::Custom`].
    fn emit(&mut self, token: Token) -> Result<()>;
}

impl TokenSink for Vec<Token> {
    fn emit(&mut self, token: Token) -> Result<()> {
        self.push(token);
        Ok(())
    }
}

/// Supplies tokens to an unmarshaller.
pub trait TokenSource {
    /// Returns `Ok(None)` once the stream is exhausted.
    fn next_token(&mut self) -> Result<Option<Token>>;
}

impl<I: Iterator<Item = Token>> TokenSource for I {
    fn next_token(&mut self) -> Result<Option<Token>> {
        Ok(self.next())
    }
}

/// Steps `marshaller` until it completes, emitting every token into `sink`.
/// Returns the number of tokens emitted.
///
/// # Errors
///
/// Propagates the first engine or sink error.
pub fn pump_marshal<S: TokenSink + ?Sized>(
    marshaller: &mut Marshaller<'_>,
    sink: &mut S,
) -> Result<usize> {
    let mut count = 0;
    loop {
        let (token, done) = marshaller.step()?;
        sink.emit(token)?;
        count += 1;
        if done {
            return Ok(count);
        }
    }
}

/// Feeds tokens from `source` into `unmarshaller` until it completes.
/// Returns the number of tokens consumed; the source is left positioned
/// just past the last one.
///
/// # Errors
///
/// Returns [`Error::UnexpectedEnd`] if the source runs dry first, and
/// otherwise propagates the first engine or source error.
pub fn pump_unmarshal<S: TokenSource + ?Sized>(
    unmarshaller: &mut Unmarshaller<'_>,
    source: &mut S,
) -> Result<usize> {
    let mut count = 0;
    loop {
        let token = source.next_token()?.ok_or(Error::UnexpectedEnd)?;
        count += 1;
        if unmarshaller.step(token)? {
            return Ok(count);
        }
    }
}
