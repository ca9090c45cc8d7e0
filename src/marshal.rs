//! Value to token stream.
//!
//! A [`Marshaller`] walks a bound value with an explicit frame stack and
//! yields one token per [`step`](Marshaller::step). Frames exist only for
//! composites (records, sequences, maps); scalars, optional indirections
//! and wildcards are resolved in place when the walk reaches them. A
//! wildcard is looked through per element, so heterogeneous containers
//! marshal each element by its own runtime type.
//!
//! ## Examples
//!
//! ```rust
//! use atlas_tok::{Atlas, Marshaller, Token};
//!
//! let atlas = Atlas::new();
//! let data = vec![Some(1i32), None];
//!
//! let mut m = Marshaller::new(&atlas);
//! m.bind(&data).unwrap();
//! let mut tokens = Vec::new();
//! loop {
//!     let (tok, done) = m.step().unwrap();
//!     tokens.push(tok);
//!     if done {
//!         break;
//!     }
//! }
//! assert_eq!(
//!     tokens,
//!     vec![Token::ArrOpen(Some(2)), Token::Int(1), Token::Null, Token::ArrClose]
//! );
//! ```

use crate::atlas::{Atlas, AtlasEntry, EntryKind, Natural, Peeled, TypeRef};
use crate::frame::{check_depth, Phase, Resolver};
use crate::options::Options;
use crate::token::Token;
use crate::{Error, Result};
use std::any::Any;
use std::sync::Arc;

/// Step-wise producer of tokens from a bound value.
pub struct Marshaller<'a> {
    resolver: Resolver<'a>,
    options: Options,
    frames: Vec<MarshalFrame<'a>>,
    phase: Phase,
}

struct MarshalFrame<'a> {
    value: &'a dyn Any,
    entry: Arc<AtlasEntry>,
    cursor: Cursor<'a>,
}

enum Cursor<'a> {
    /// The root before its first token.
    Start,
    /// Record fields left to emit, as indices into the entry's field list.
    /// `pending` is set once the key of `order[next]` has been emitted.
    Fields {
        order: Vec<usize>,
        next: usize,
        pending: bool,
    },
    Elements {
        len: usize,
        next: usize,
    },
    Entries {
        entries: Vec<(String, &'a dyn Any)>,
        next: usize,
        pending: bool,
    },
}

enum Action<'a> {
    Root,
    Emit(Token),
    Descend(&'a dyn Any, TypeRef),
    Close(Token),
}

/// Outcome of looking at one value: a scalar token, or an open token plus
/// the cursor of the frame that walks it.
enum Descent<'a> {
    Peel(&'a dyn Any, Arc<AtlasEntry>),
    Emit(Token),
    Open(Token, Cursor<'a>),
}

impl<'a> Marshaller<'a> {
    #[must_use]
    pub fn new(atlas: &'a Atlas) -> Self {
        Marshaller {
            resolver: Resolver::new(atlas),
            options: Options::default(),
            frames: Vec::new(),
            phase: Phase::Unbound,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Binds a value whose type has a natural mapping or a registered entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the type cannot be resolved.
    pub fn bind<T: Natural>(&mut self, value: &'a T) -> Result<()> {
        self.bind_dyn(value, TypeRef::natural::<T>())
    }

    /// Binds a value whose type is only known to the atlas by registration.
    pub fn bind_registered<T: Any>(&mut self, value: &'a T) -> Result<()> {
        self.bind_dyn(value, TypeRef::of::<T>())
    }

    /// Binds a type-erased value under an explicit type tag.
    ///
    /// Any previous run is discarded. The root type is resolved here, so a
    /// successful bind guarantees the first step has an entry to work with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryMismatch`] if `value` is not of type `ty`, or
    /// [`Error::NotFound`] if `ty` cannot be resolved.
    pub fn bind_dyn(&mut self, value: &'a dyn Any, ty: TypeRef) -> Result<()> {
        self.frames.clear();
        self.phase = Phase::Unbound;
        if (*value).type_id() != ty.id() {
            return Err(Error::EntryMismatch { expected: ty.name() });
        }
        let entry = self.resolver.resolve(&ty)?;
        tracing::debug!(root = ty.name(), shape = ?entry.shape(), "marshaller bound");
        self.frames.push(MarshalFrame {
            value,
            entry,
            cursor: Cursor::Start,
        });
        self.phase = Phase::Running;
        Ok(())
    }

    /// Produces the next token and whether it completed the value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Overshoot`] once the run is complete,
    /// [`Error::NotBound`] before a bind or after a failed step, and any
    /// resolution or entry error met along the way. A failed step abandons
    /// the run.
    pub fn step(&mut self) -> Result<(Token, bool)> {
        self.phase.ready()?;
        match self.advance() {
            Ok(token) => {
                let done = self.frames.is_empty();
                if done {
                    self.phase = Phase::Done;
                    tracing::debug!("marshal complete");
                }
                Ok((token, done))
            }
            Err(err) => {
                self.frames.clear();
                self.phase = Phase::Failed;
                Err(err)
            }
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Number of frames currently on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn advance(&mut self) -> Result<Token> {
        let top = self.frames.last_mut().ok_or(Error::NotBound)?;
        let value = top.value;
        let action = match (&top.entry.kind, &mut top.cursor) {
            (_, Cursor::Start) => Action::Root,
            (
                EntryKind::Record(rec),
                Cursor::Fields {
                    order,
                    next,
                    pending,
                },
            ) => match order.get(*next).and_then(|&i| rec.fields.get(i)) {
                None => Action::Close(Token::MapClose),
                Some(field) if *pending => {
                    *pending = false;
                    *next += 1;
                    let child = (field.get)(value).ok_or_else(|| top.entry.mismatch())?;
                    Action::Descend(child, field.ty)
                }
                Some(field) => {
                    *pending = true;
                    Action::Emit(Token::Key(field.key.clone()))
                }
            },
            (EntryKind::Sequence(seq), Cursor::Elements { len, next }) => {
                if *next >= *len {
                    Action::Close(Token::ArrClose)
                } else {
                    let child = (seq.get)(value, *next).ok_or_else(|| top.entry.mismatch())?;
                    *next += 1;
                    Action::Descend(child, seq.elem)
                }
            }
            (
                EntryKind::Map(map),
                Cursor::Entries {
                    entries,
                    next,
                    pending,
                },
            ) => match entries.get(*next) {
                None => Action::Close(Token::MapClose),
                Some((_, child)) if *pending => {
                    let child = *child;
                    *pending = false;
                    *next += 1;
                    Action::Descend(child, map.value)
                }
                Some((key, _)) => {
                    let key = key.clone();
                    *pending = true;
                    Action::Emit(Token::Key(key))
                }
            },
            _ => return Err(top.entry.mismatch()),
        };

        match action {
            Action::Emit(token) => Ok(token),
            Action::Root => match self.frames.pop() {
                Some(root) => self.descend(root.value, root.entry),
                None => Err(Error::NotBound),
            },
            Action::Descend(child, ty) => {
                let entry = self.resolver.resolve(&ty)?;
                self.descend(child, entry)
            }
            Action::Close(token) => {
                if let Some(frame) = self.frames.pop() {
                    tracing::trace!(depth = self.frames.len(), ty = frame.entry.type_name(), "pop");
                }
                Ok(token)
            }
        }
    }

    /// Produces the first token of `value`, pushing a frame if it is a
    /// composite. Optional and wildcard layers are looked through first.
    fn descend(&mut self, mut value: &'a dyn Any, mut entry: Arc<AtlasEntry>) -> Result<Token> {
        loop {
            let descent = match &entry.kind {
                EntryKind::Optional(opt) => match (opt.get)(value) {
                    Some(Some(inner)) => Descent::Peel(inner, self.resolver.resolve(&opt.inner)?),
                    Some(None) => Descent::Emit(Token::Null),
                    None => return Err(entry.mismatch()),
                },
                EntryKind::Wildcard(w) => match (w.peel)(value) {
                    Some(Peeled::Value(inner, ty)) => Descent::Peel(inner, self.resolver.resolve(&ty)?),
                    Some(Peeled::Token(token)) => Descent::Emit(token),
                    None => return Err(entry.mismatch()),
                },
                EntryKind::Scalar(scalar) => Descent::Emit((scalar.encode)(value)?),
                EntryKind::Record(rec) => {
                    let order: Vec<usize> = rec
                        .fields
                        .iter()
                        .enumerate()
                        .filter(|(_, f)| !f.omit.as_ref().is_some_and(|omit| omit(value)))
                        .map(|(i, _)| i)
                        .collect();
                    Descent::Open(
                        Token::MapOpen(Some(order.len())),
                        Cursor::Fields {
                            order,
                            next: 0,
                            pending: false,
                        },
                    )
                }
                EntryKind::Sequence(seq) => {
                    let len = (seq.len)(value).ok_or_else(|| entry.mismatch())?;
                    Descent::Open(Token::ArrOpen(Some(len)), Cursor::Elements { len, next: 0 })
                }
                EntryKind::Map(map) => {
                    let entries = (map.entries)(value).ok_or_else(|| entry.mismatch())?;
                    Descent::Open(
                        Token::MapOpen(Some(entries.len())),
                        Cursor::Entries {
                            entries,
                            next: 0,
                            pending: false,
                        },
                    )
                }
            };

            match descent {
                Descent::Peel(inner, inner_entry) => {
                    value = inner;
                    entry = inner_entry;
                }
                Descent::Emit(token) => return Ok(token),
                Descent::Open(token, cursor) => {
                    check_depth(self.frames.len(), self.options.max_depth)?;
                    tracing::trace!(depth = self.frames.len(), ty = entry.type_name(), "push");
                    self.frames.push(MarshalFrame {
                        value,
                        entry,
                        cursor,
                    });
                    return Ok(token);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::value::{Dyn, Value};
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct Account {
        name: String,
        limit: Option<u32>,
        tags: Vec<String>,
    }

    impl Natural for Account {
        fn natural() -> AtlasEntry {
            AtlasEntry::record::<Account>()
                .field("name", |a| &a.name, |a, v| a.name = v)
                .field("limit", |a| &a.limit, |a, v| a.limit = v)
                .field("tags", |a| &a.tags, |a, v| a.tags = v)
                .omit_if(|a| a.tags.is_empty())
                .build()
        }
    }

    fn drain(m: &mut Marshaller<'_>) -> Vec<Token> {
        let mut out = Vec::new();
        loop {
            let (tok, done) = m.step().unwrap();
            out.push(tok);
            if done {
                return out;
            }
        }
    }

    #[test]
    fn test_scalar_root_single_step() {
        let atlas = Atlas::new();
        let s = String::from("value");
        let mut m = Marshaller::new(&atlas);
        m.bind(&s).unwrap();
        assert_eq!(m.depth(), 1);
        assert_eq!(m.step().unwrap(), (Token::from("value"), true));
        assert!(m.is_done());
        assert_eq!(m.depth(), 0);
        assert_eq!(m.step(), Err(Error::Overshoot));
    }

    #[test]
    fn test_step_before_bind() {
        let atlas = Atlas::new();
        let mut m = Marshaller::new(&atlas);
        assert_eq!(m.step(), Err(Error::NotBound));
    }

    #[test]
    fn test_record_with_omitted_field() {
        let atlas = Atlas::new();
        let account = Account {
            name: "ops".into(),
            limit: None,
            tags: vec![],
        };
        let mut m = Marshaller::new(&atlas);
        m.bind(&account).unwrap();
        assert_eq!(
            drain(&mut m),
            vec![
                Token::MapOpen(Some(2)),
                Token::Key("name".into()),
                Token::from("ops"),
                Token::Key("limit".into()),
                Token::Null,
                Token::MapClose,
            ]
        );
    }

    #[test]
    fn test_depth_tracks_nesting() {
        let atlas = Atlas::new();
        let nested = vec![vec![1u8]];
        let mut m = Marshaller::new(&atlas);
        m.bind(&nested).unwrap();
        assert_eq!(m.step().unwrap().0, Token::ArrOpen(Some(1)));
        assert_eq!(m.depth(), 1);
        assert_eq!(m.step().unwrap().0, Token::ArrOpen(Some(1)));
        assert_eq!(m.depth(), 2);
        assert_eq!(m.step().unwrap().0, Token::Uint(1));
        assert_eq!(m.step().unwrap().0, Token::ArrClose);
        assert_eq!(m.depth(), 1);
        assert_eq!(m.step().unwrap(), (Token::ArrClose, true));
    }

    #[test]
    fn test_heterogeneous_wildcards() {
        let atlas = Atlas::new();
        let mut inner = BTreeMap::new();
        inner.insert("k".to_string(), true);
        let items = vec![
            Value::from(1i64),
            Value::dynamic(inner),
            Value::Dyn(Dyn::new(Some(2.5f64))),
            Value::Null,
        ];
        let mut m = Marshaller::new(&atlas);
        m.bind(&items).unwrap();
        assert_eq!(
            drain(&mut m),
            vec![
                Token::ArrOpen(Some(4)),
                Token::Int(1),
                Token::MapOpen(Some(1)),
                Token::Key("k".into()),
                Token::Bool(true),
                Token::MapClose,
                Token::Float(2.5),
                Token::Null,
                Token::ArrClose,
            ]
        );
    }

    #[test]
    fn test_unresolvable_dynamic_fails_mid_run() {
        struct Secret;
        let atlas = Atlas::new();
        let items = vec![Value::Dyn(Dyn::opaque(Secret))];
        let mut m = Marshaller::new(&atlas);
        m.bind(&items).unwrap();
        assert_eq!(m.step().unwrap().0, Token::ArrOpen(Some(1)));
        let err = m.step().unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(m.step(), Err(Error::NotBound));
    }

    #[test]
    fn test_bind_dyn_checks_type() {
        let atlas = Atlas::new();
        let n = 5u8;
        let mut m = Marshaller::new(&atlas);
        let err = m.bind_dyn(&n, TypeRef::natural::<i8>()).unwrap_err();
        assert_eq!(err, Error::EntryMismatch { expected: "i8" });
        m.bind_dyn(&n, TypeRef::natural::<u8>()).unwrap();
        assert_eq!(m.step().unwrap(), (Token::Uint(5), true));
    }

    #[test]
    fn test_bind_unregistered_record() {
        #[derive(Default)]
        struct Plain;
        let atlas = Atlas::new();
        let mut m = Marshaller::new(&atlas);
        let err = m.bind_registered(&Plain).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(m.step(), Err(Error::NotBound));
    }

    #[test]
    fn test_depth_limit() {
        let atlas = Atlas::new();
        let nested = vec![vec![vec![0u8]]];
        let mut m = Marshaller::new(&atlas).with_options(Options::new().with_max_depth(2));
        m.bind(&nested).unwrap();
        m.step().unwrap();
        m.step().unwrap();
        assert_eq!(m.step(), Err(Error::DepthLimit { limit: 2 }));
    }

    #[test]
    fn test_rebind_discards_previous_run() {
        let atlas = Atlas::new();
        let first = vec![1u8, 2];
        let second = vec![3u8];
        let mut m = Marshaller::new(&atlas);
        m.bind(&first).unwrap();
        m.step().unwrap();
        m.bind(&second).unwrap();
        assert_eq!(
            drain(&mut m),
            vec![Token::ArrOpen(Some(1)), Token::Uint(3), Token::ArrClose]
        );
    }
}
