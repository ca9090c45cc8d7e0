//! Token stream to value.
//!
//! An [`Unmarshaller`] consumes one token per [`step`](Unmarshaller::step)
//! and rebuilds a value into a bound [`Slot`]. Composites are built bottom
//! up: each open token pushes a frame owning a fresh container, and each
//! close token pops it and hands the finished value to its parent (or, for
//! the root, writes it into the slot). Optional and wildcard layers do not
//! get frames of their own; they are recorded on the frame they wrap and
//! re-applied when it completes.
//!
//! ## Examples
//!
//! ```rust
//! use atlas_tok::{Atlas, Token, Unmarshaller};
//! use std::collections::BTreeMap;
//!
//! let atlas = Atlas::new();
//! let mut dest: BTreeMap<String, Vec<u8>> = BTreeMap::new();
//!
//! let mut u = Unmarshaller::new(&atlas);
//! u.bind(&mut dest).unwrap();
//! let tokens = [
//!     Token::MapOpen(None),
//!     Token::Key("a".into()),
//!     Token::ArrOpen(None),
//!     Token::Uint(1),
//!     Token::ArrClose,
//!     Token::MapClose,
//! ];
//! for tok in tokens {
//!     u.step(tok).unwrap();
//! }
//! assert!(u.is_done());
//! drop(u);
//! assert_eq!(dest["a"], vec![1]);
//! ```

use crate::atlas::{Atlas, AtlasEntry, EntryKind, Natural, Shape, TypeRef};
use crate::frame::{check_depth, Phase, Resolver};
use crate::options::{Options, UnknownKeys};
use crate::token::{Token, TokenKind};
use crate::{Error, Result};
use std::any::Any;
use std::sync::Arc;

/// A destination for unmarshalling.
///
/// An addressable slot borrows the caller's storage and is overwritten on
/// completion. A detached slot owns a value copy: only map and sequence
/// containers may be bound that way, and the result is read back with
/// [`Unmarshaller::into_detached`].
///
/// # Examples
///
/// ```rust
/// use atlas_tok::{Atlas, Error, Slot, Unmarshaller, Value};
///
/// let atlas = Atlas::new();
/// let mut u = Unmarshaller::new(&atlas);
///
/// let err = u.bind(Slot::detached(String::new())).unwrap_err();
/// assert!(matches!(err, Error::InvalidUnmarshalTarget { .. }));
///
/// let err = u.bind(Slot::detached(Value::Null)).unwrap_err();
/// assert!(matches!(err, Error::Unsettable { .. }));
///
/// let mut s = String::new();
/// assert!(u.bind(Slot::addr(&mut s)).is_ok());
/// ```
pub struct Slot<'a> {
    target: Target<'a>,
    ty: TypeRef,
}

enum Target<'a> {
    Addr(&'a mut dyn Any),
    Detached(Box<dyn Any>),
}

impl<'a> Slot<'a> {
    pub fn addr<T: Natural>(dest: &'a mut T) -> Self {
        Slot {
            target: Target::Addr(dest),
            ty: TypeRef::natural::<T>(),
        }
    }

    /// An addressable slot for a type only known through registration.
    pub fn addr_registered<T: Any>(dest: &'a mut T) -> Self {
        Slot {
            target: Target::Addr(dest),
            ty: TypeRef::of::<T>(),
        }
    }

    pub fn detached<T: Natural>(value: T) -> Self {
        Slot {
            target: Target::Detached(Box::new(value)),
            ty: TypeRef::natural::<T>(),
        }
    }

    #[must_use]
    pub fn type_ref(&self) -> TypeRef {
        self.ty
    }

    #[must_use]
    pub fn is_addressable(&self) -> bool {
        matches!(self.target, Target::Addr(_))
    }
}

impl<'a, T: Natural> From<&'a mut T> for Slot<'a> {
    fn from(dest: &'a mut T) -> Self {
        Slot::addr(dest)
    }
}

/// Step-wise consumer of tokens into a bound destination.
pub struct Unmarshaller<'a> {
    resolver: Resolver<'a>,
    options: Options,
    root: Option<(Target<'a>, Arc<AtlasEntry>)>,
    frames: Vec<Frame>,
    phase: Phase,
}

enum Frame {
    /// The root before its first token.
    Root(Arc<AtlasEntry>),
    Build(Build),
    /// Discarding the value of an unknown key. Holds the composites opened
    /// so far, with a `Key` marker while a key's value is pending.
    Skip(Vec<TokenKind>),
}

struct Build {
    entry: Arc<AtlasEntry>,
    value: Box<dyn Any>,
    awaiting: Awaiting,
    /// Optional and wildcard entries looked through on the way in,
    /// outermost first.
    wraps: Vec<Arc<AtlasEntry>>,
    dest: Dest,
}

enum Awaiting {
    /// A key, an element or the close token.
    Entry,
    /// The value of the record field at this index.
    Field(usize),
    /// The value of this map key.
    Key(String),
}

/// Where a finished value goes.
enum Dest {
    Root,
    Field(usize),
    Key(String),
    Element,
}

enum Next {
    Stay,
    Root(Arc<AtlasEntry>, Token),
    Begin(TypeRef, Token, Dest),
    Skip,
    EndSkip,
    Complete,
}

enum Begin {
    Inner(TypeRef),
    Open(Box<dyn Any>),
}

impl<'a> Unmarshaller<'a> {
    #[must_use]
    pub fn new(atlas: &'a Atlas) -> Self {
        Unmarshaller {
            resolver: Resolver::new(atlas),
            options: Options::default(),
            root: None,
            frames: Vec::new(),
            phase: Phase::Unbound,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Binds a destination, discarding any previous run.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the destination type cannot be resolved
    /// - [`Error::Unsettable`] for a detached wildcard
    /// - [`Error::InvalidUnmarshalTarget`] for any other detached value that
    ///   is not a map or sequence container
    pub fn bind(&mut self, slot: impl Into<Slot<'a>>) -> Result<()> {
        let slot = slot.into();
        self.frames.clear();
        self.root = None;
        self.phase = Phase::Unbound;

        let entry = self.resolver.resolve(&slot.ty)?;
        if let Target::Detached(_) = slot.target {
            match entry.shape() {
                Shape::Wildcard => {
                    return Err(Error::Unsettable {
                        type_name: slot.ty.name(),
                    })
                }
                Shape::Map | Shape::Sequence => {}
                _ => {
                    return Err(Error::InvalidUnmarshalTarget {
                        type_name: slot.ty.name(),
                    })
                }
            }
        }

        tracing::debug!(
            root = slot.ty.name(),
            addressable = slot.is_addressable(),
            "unmarshaller bound"
        );
        self.frames.push(Frame::Root(Arc::clone(&entry)));
        self.root = Some((slot.target, entry));
        self.phase = Phase::Running;
        Ok(())
    }

    /// Consumes one token. Returns `true` on the token that completes the
    /// root value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Incompatible`] when the token does not fit the
    /// destination shape, [`Error::Overshoot`] once the run is complete and
    /// [`Error::NotBound`] before a bind or after a failed step. A failed
    /// step abandons the run.
    pub fn step(&mut self, token: Token) -> Result<bool> {
        self.phase.ready()?;
        match self.consume(token) {
            Ok(()) => {
                let done = self.frames.is_empty();
                if done {
                    self.phase = Phase::Done;
                    tracing::debug!("unmarshal complete");
                }
                Ok(done)
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

    /// Returns the filled container of a completed run bound to a detached
    /// slot.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::{Atlas, Slot, Token, Unmarshaller};
    ///
    /// let atlas = Atlas::new();
    /// let mut u = Unmarshaller::new(&atlas);
    /// u.bind(Slot::detached(Vec::<bool>::new())).unwrap();
    /// u.step(Token::ArrOpen(None)).unwrap();
    /// u.step(Token::Bool(true)).unwrap();
    /// u.step(Token::ArrClose).unwrap();
    ///
    /// let out = u.into_detached().unwrap();
    /// assert_eq!(out.downcast_ref::<Vec<bool>>(), Some(&vec![true]));
    /// ```
    #[must_use]
    pub fn into_detached(self) -> Option<Box<dyn Any>> {
        if self.phase != Phase::Done {
            return None;
        }
        match self.root {
            Some((Target::Detached(value), _)) => Some(value),
            _ => None,
        }
    }

    fn consume(&mut self, token: Token) -> Result<()> {
        let policy = self.options.unknown_keys;
        let next = match self.frames.last_mut() {
            None => return Err(Error::NotBound),
            Some(Frame::Root(entry)) => Next::Root(Arc::clone(entry), token),
            Some(Frame::Skip(open)) => {
                skip(open, token.kind())?;
                if open.is_empty() {
                    Next::EndSkip
                } else {
                    Next::Stay
                }
            }
            Some(Frame::Build(build)) => route(build, token, policy)?,
        };

        match next {
            Next::Stay => Ok(()),
            Next::Root(entry, token) => {
                self.frames.pop();
                self.begin(entry, token, Dest::Root)
            }
            Next::Begin(ty, token, dest) => {
                let entry = self.resolver.resolve(&ty)?;
                self.begin(entry, token, dest)
            }
            Next::Skip => {
                self.frames.push(Frame::Skip(Vec::new()));
                Ok(())
            }
            Next::EndSkip => {
                self.frames.pop();
                Ok(())
            }
            Next::Complete => self.complete(),
        }
    }

    /// Starts a value of `entry` with its first token: a scalar is decoded
    /// and delivered at once, an open token pushes a frame.
    fn begin(&mut self, mut entry: Arc<AtlasEntry>, token: Token, dest: Dest) -> Result<()> {
        let kind = token.kind();
        let mut wraps = Vec::new();
        loop {
            let begin = match &entry.kind {
                EntryKind::Optional(opt) => match (kind, opt.none) {
                    (TokenKind::Null, Some(none)) => return self.finish(none(), &wraps, dest),
                    _ => Begin::Inner(opt.inner),
                },
                EntryKind::Wildcard(w) => match kind {
                    TokenKind::MapOpen => Begin::Inner(w.map),
                    TokenKind::ArrOpen => Begin::Inner(w.seq),
                    k if k.is_scalar() => return self.finish((w.scalar)(token)?, &wraps, dest),
                    k => return Err(Error::incompatible("value", k)),
                },
                EntryKind::Scalar(scalar) => {
                    if !kind.is_scalar() {
                        return Err(Error::incompatible(scalar.expected, kind));
                    }
                    return self.finish((scalar.decode)(token)?, &wraps, dest);
                }
                EntryKind::Record(rec) => {
                    expect(kind, TokenKind::MapOpen)?;
                    Begin::Open((rec.new)())
                }
                EntryKind::Map(map) => {
                    expect(kind, TokenKind::MapOpen)?;
                    Begin::Open((map.new)())
                }
                EntryKind::Sequence(seq) => {
                    expect(kind, TokenKind::ArrOpen)?;
                    Begin::Open((seq.new)())
                }
            };

            match begin {
                Begin::Inner(ty) => {
                    let inner = self.resolver.resolve(&ty)?;
                    wraps.push(std::mem::replace(&mut entry, inner));
                }
                Begin::Open(value) => {
                    check_depth(self.frames.len(), self.options.max_depth)?;
                    tracing::trace!(depth = self.frames.len(), ty = entry.type_name(), "push");
                    self.frames.push(Frame::Build(Build {
                        entry,
                        value,
                        awaiting: Awaiting::Entry,
                        wraps,
                        dest,
                    }));
                    return Ok(());
                }
            }
        }
    }

    fn complete(&mut self) -> Result<()> {
        let Some(Frame::Build(build)) = self.frames.pop() else {
            return Err(Error::NotBound);
        };
        tracing::trace!(depth = self.frames.len(), ty = build.entry.type_name(), "pop");
        self.finish(build.value, &build.wraps, build.dest)
    }

    fn finish(&mut self, value: Box<dyn Any>, wraps: &[Arc<AtlasEntry>], dest: Dest) -> Result<()> {
        let value = apply_wraps(value, wraps)?;
        self.deliver(value, dest)
    }

    fn deliver(&mut self, value: Box<dyn Any>, dest: Dest) -> Result<()> {
        if let Dest::Root = dest {
            return match &mut self.root {
                Some((Target::Addr(slot), entry)) => (entry.assign)(&mut **slot, value),
                Some((Target::Detached(slot), _)) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(Error::NotBound),
            };
        }

        let Some(Frame::Build(parent)) = self.frames.last_mut() else {
            return Err(Error::NotBound);
        };
        match (&parent.entry.kind, dest) {
            (EntryKind::Record(rec), Dest::Field(i)) => {
                let field = rec.fields.get(i).ok_or_else(|| parent.entry.mismatch())?;
                (field.set)(&mut *parent.value, value)
            }
            (EntryKind::Map(map), Dest::Key(key)) => (map.insert)(&mut *parent.value, key, value),
            (EntryKind::Sequence(seq), Dest::Element) => (seq.push)(&mut *parent.value, value),
            _ => Err(parent.entry.mismatch()),
        }
    }
}

/// Decides what a token means to a frame that is mid-build.
fn route(build: &mut Build, token: Token, policy: UnknownKeys) -> Result<Next> {
    let awaiting = std::mem::replace(&mut build.awaiting, Awaiting::Entry);
    match (&build.entry.kind, awaiting, token) {
        (EntryKind::Record(rec), Awaiting::Field(i), token) => {
            let field = rec.fields.get(i).ok_or_else(|| build.entry.mismatch())?;
            Ok(Next::Begin(field.ty, token, Dest::Field(i)))
        }
        (EntryKind::Record(rec), Awaiting::Entry, Token::Key(key)) => {
            if let Some(i) = rec.field_index(&key) {
                build.awaiting = Awaiting::Field(i);
                return Ok(Next::Stay);
            }
            match rec.unknown_keys.unwrap_or(policy) {
                UnknownKeys::Skip => {
                    tracing::trace!(key = %key, record = build.entry.type_name(), "skipping unknown key");
                    Ok(Next::Skip)
                }
                UnknownKeys::Reject => Err(Error::UnknownKey {
                    record: build.entry.type_name(),
                    key,
                }),
            }
        }
        (EntryKind::Map(_), Awaiting::Entry, Token::Key(key)) => {
            build.awaiting = Awaiting::Key(key);
            Ok(Next::Stay)
        }
        (EntryKind::Map(map), Awaiting::Key(key), token) => {
            Ok(Next::Begin(map.value, token, Dest::Key(key)))
        }
        (EntryKind::Record(_) | EntryKind::Map(_), Awaiting::Entry, Token::MapClose) => {
            Ok(Next::Complete)
        }
        (EntryKind::Record(_) | EntryKind::Map(_), Awaiting::Entry, token) => {
            Err(Error::incompatible("key or map close", token.kind()))
        }
        (EntryKind::Sequence(_), _, Token::ArrClose) => Ok(Next::Complete),
        (EntryKind::Sequence(seq), _, token) => Ok(Next::Begin(seq.elem, token, Dest::Element)),
        _ => Err(build.entry.mismatch()),
    }
}

/// Checks one token of a discarded subtree against the composites open in
/// it. Maps must alternate key and value, and every close must match its
/// open.
fn skip(open: &mut Vec<TokenKind>, kind: TokenKind) -> Result<()> {
    if open.last() == Some(&TokenKind::MapOpen) {
        return match kind {
            TokenKind::Key => {
                open.push(TokenKind::Key);
                Ok(())
            }
            TokenKind::MapClose => {
                open.pop();
                skipped_value(open);
                Ok(())
            }
            kind => Err(Error::incompatible("key or map close", kind)),
        };
    }
    match kind {
        TokenKind::MapOpen | TokenKind::ArrOpen => open.push(kind),
        TokenKind::ArrClose if open.last() == Some(&TokenKind::ArrOpen) => {
            open.pop();
            skipped_value(open);
        }
        kind if kind.is_scalar() => skipped_value(open),
        kind => return Err(Error::incompatible("value", kind)),
    }
    Ok(())
}

/// A whole value was consumed; it settles a pending key.
fn skipped_value(open: &mut Vec<TokenKind>) {
    if open.last() == Some(&TokenKind::Key) {
        open.pop();
    }
}

fn expect(found: TokenKind, wanted: TokenKind) -> Result<()> {
    if found == wanted {
        Ok(())
    } else {
        Err(Error::incompatible(wanted.as_str(), found))
    }
}

/// Re-applies looked-through layers, innermost first.
fn apply_wraps(mut value: Box<dyn Any>, wraps: &[Arc<AtlasEntry>]) -> Result<Box<dyn Any>> {
    for entry in wraps.iter().rev() {
        value = match &entry.kind {
            EntryKind::Optional(opt) => (opt.wrap)(value)?,
            EntryKind::Wildcard(w) => (w.wrap)(value)?,
            _ => return Err(entry.mismatch()),
        };
    }
    Ok(value)
}
