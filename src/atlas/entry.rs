//! Per-type descriptors: how one type decomposes into tokens and how it is
//! rebuilt from them.
//!
//! Accessors are stored type-erased (`&dyn Any` in, `&dyn Any` out) so the
//! engines can walk values of any registered type without knowing it
//! statically. Each erased closure downcasts to the concrete type it was
//! built for and reports [`Error::EntryMismatch`] if handed anything else.

use super::natural::{Natural, ScalarValue};
use super::TypeRef;
use crate::options::UnknownKeys;
use crate::token::Token;
use crate::{Error, Result};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

pub(crate) type Getter = Box<dyn Fn(&dyn Any) -> Option<&dyn Any> + Send + Sync>;
pub(crate) type IndexGetter = Box<dyn Fn(&dyn Any, usize) -> Option<&dyn Any> + Send + Sync>;
pub(crate) type EntriesFn =
    Box<dyn Fn(&dyn Any) -> Option<Vec<(String, &dyn Any)>> + Send + Sync>;
pub(crate) type LenFn = Box<dyn Fn(&dyn Any) -> Option<usize> + Send + Sync>;
pub(crate) type OptionalGetter = Box<dyn Fn(&dyn Any) -> Option<Option<&dyn Any>> + Send + Sync>;
pub(crate) type Setter = Box<dyn Fn(&mut dyn Any, Box<dyn Any>) -> Result<()> + Send + Sync>;
pub(crate) type Inserter = Box<dyn Fn(&mut dyn Any, String, Box<dyn Any>) -> Result<()> + Send + Sync>;
pub(crate) type Predicate = Box<dyn Fn(&dyn Any) -> bool + Send + Sync>;
pub(crate) type Encoder = Box<dyn Fn(&dyn Any) -> Result<Token> + Send + Sync>;
pub(crate) type Decoder = Box<dyn Fn(Token) -> Result<Box<dyn Any>> + Send + Sync>;
pub(crate) type Wrapper = Box<dyn Fn(Box<dyn Any>) -> Result<Box<dyn Any>> + Send + Sync>;

/// The structural category of an [`AtlasEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Record,
    Sequence,
    Map,
    Scalar,
    Optional,
    Wildcard,
}

/// What a wildcard holds once looked through.
pub enum Peeled<'v> {
    /// A scalar, already in token form.
    Token(Token),
    /// A value whose own entry is found by resolving its type.
    Value(&'v dyn Any, TypeRef),
}

/// Describes how values of one type map to and from tokens.
///
/// Entries are built with the constructors on this type ([`AtlasEntry::record`],
/// [`AtlasEntry::sequence`], [`AtlasEntry::map`], [`AtlasEntry::scalar`],
/// [`AtlasEntry::transform`]) and either returned from a [`Natural`] impl or
/// registered on an [`Atlas`](crate::Atlas) to override the natural mapping.
///
/// # Examples
///
/// ```rust
/// use atlas_tok::{AtlasEntry, Shape};
///
/// #[derive(Default)]
/// struct Point { x: i64, y: i64 }
///
/// let entry = AtlasEntry::record::<Point>()
///     .field("x", |p| &p.x, |p, v| p.x = v)
///     .field("y", |p| &p.y, |p, v| p.y = v)
///     .build();
/// assert_eq!(entry.shape(), Shape::Record);
/// ```
pub struct AtlasEntry {
    ty: TypeRef,
    pub(crate) kind: EntryKind,
    pub(crate) assign: fn(&mut dyn Any, Box<dyn Any>) -> Result<()>,
}

pub(crate) enum EntryKind {
    Record(RecordEntry),
    Sequence(SequenceEntry),
    Map(MapEntry),
    Scalar(ScalarEntry),
    Optional(OptionalEntry),
    Wildcard(WildcardEntry),
}

pub(crate) struct RecordEntry {
    pub(crate) fields: Vec<Field>,
    pub(crate) new: fn() -> Box<dyn Any>,
    pub(crate) unknown_keys: Option<UnknownKeys>,
}

pub(crate) struct Field {
    pub(crate) key: String,
    pub(crate) ty: TypeRef,
    pub(crate) get: Getter,
    pub(crate) set: Setter,
    pub(crate) omit: Option<Predicate>,
}

pub(crate) struct SequenceEntry {
    pub(crate) elem: TypeRef,
    pub(crate) len: LenFn,
    pub(crate) get: IndexGetter,
    pub(crate) new: fn() -> Box<dyn Any>,
    pub(crate) push: Setter,
}

pub(crate) struct MapEntry {
    pub(crate) value: TypeRef,
    pub(crate) entries: EntriesFn,
    pub(crate) new: fn() -> Box<dyn Any>,
    pub(crate) insert: Inserter,
}

pub(crate) struct ScalarEntry {
    pub(crate) expected: &'static str,
    pub(crate) encode: Encoder,
    pub(crate) decode: Decoder,
}

pub(crate) struct OptionalEntry {
    pub(crate) inner: TypeRef,
    pub(crate) get: OptionalGetter,
    pub(crate) wrap: Wrapper,
    /// Produces the empty value for a null token; `None` for non-nullable
    /// indirections, which hand the null to their inner type instead.
    pub(crate) none: Option<fn() -> Box<dyn Any>>,
}

pub(crate) struct WildcardEntry {
    pub(crate) peel: fn(&dyn Any) -> Option<Peeled<'_>>,
    pub(crate) map: TypeRef,
    pub(crate) seq: TypeRef,
    pub(crate) scalar: fn(Token) -> Result<Box<dyn Any>>,
    pub(crate) wrap: fn(Box<dyn Any>) -> Result<Box<dyn Any>>,
}

impl RecordEntry {
    pub(crate) fn field_index(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.key == key)
    }
}

impl AtlasEntry {
    pub(crate) fn new<T: Any>(ty: TypeRef, kind: EntryKind) -> Self {
        AtlasEntry {
            ty,
            kind,
            assign: assign::<T>,
        }
    }

    /// Starts a record entry for `R`. Fields are emitted in declaration order.
    pub fn record<R: Any + Default>() -> RecordBuilder<R> {
        RecordBuilder {
            fields: Vec::new(),
            unknown_keys: None,
            _marker: PhantomData,
        }
    }

    /// Builds an ordered-sequence entry for container `C` of `T`.
    pub fn sequence<C, T, L, G, P>(len: L, get: G, push: P) -> Self
    where
        C: Any + Default,
        T: Natural,
        L: Fn(&C) -> usize + Send + Sync + 'static,
        G: Fn(&C, usize) -> Option<&T> + Send + Sync + 'static,
        P: Fn(&mut C, T) + Send + Sync + 'static,
    {
        let kind = EntryKind::Sequence(SequenceEntry {
            elem: TypeRef::natural::<T>(),
            len: Box::new(move |v: &dyn Any| v.downcast_ref::<C>().map(&len)),
            get: index_getter(move |v, i| {
                v.downcast_ref::<C>()
                    .and_then(|c| get(c, i))
                    .map(|t| t as &dyn Any)
            }),
            new: new_default::<C>,
            push: Box::new(move |v: &mut dyn Any, x: Box<dyn Any>| -> Result<()> {
                let c = v.downcast_mut::<C>().ok_or_else(Error::entry_mismatch::<C>)?;
                push(c, downcast::<T>(x)?);
                Ok(())
            }),
        });
        AtlasEntry::new::<C>(TypeRef::of::<C>(), kind)
    }

    /// Builds an associative-map entry for container `M` with string keys and
    /// values of `T`. `entries` decides the key order on the wire.
    pub fn map<M, T, E, I>(entries: E, insert: I) -> Self
    where
        M: Any + Default,
        T: Natural,
        E: Fn(&M) -> Vec<(String, &T)> + Send + Sync + 'static,
        I: Fn(&mut M, String, T) + Send + Sync + 'static,
    {
        let kind = EntryKind::Map(MapEntry {
            value: TypeRef::natural::<T>(),
            entries: entries_fn(move |v| {
                v.downcast_ref::<M>().map(|m| {
                    entries(m)
                        .into_iter()
                        .map(|(k, t)| (k, t as &dyn Any))
                        .collect()
                })
            }),
            new: new_default::<M>,
            insert: Box::new(move |v: &mut dyn Any, k: String, x: Box<dyn Any>| -> Result<()> {
                let m = v.downcast_mut::<M>().ok_or_else(Error::entry_mismatch::<M>)?;
                insert(m, k, downcast::<T>(x)?);
                Ok(())
            }),
        });
        AtlasEntry::new::<M>(TypeRef::of::<M>(), kind)
    }

    /// Builds a scalar entry for a type with a native token form.
    pub fn scalar<T: ScalarValue>() -> Self {
        let kind = EntryKind::Scalar(ScalarEntry {
            expected: T::EXPECTED,
            encode: Box::new(|v: &dyn Any| {
                v.downcast_ref::<T>()
                    .map(T::to_token)
                    .ok_or_else(Error::entry_mismatch::<T>)
            }),
            decode: Box::new(|tok: Token| T::from_token(tok).map(|t| Box::new(t) as Box<dyn Any>)),
        });
        AtlasEntry::new::<T>(TypeRef::of::<T>(), kind)
    }

    /// Builds a custom scalar encoding for `T` through the intermediate
    /// scalar `S`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::{Atlas, AtlasEntry, Error};
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct Celsius(i64);
    ///
    /// let atlas = Atlas::builder()
    ///     .register(AtlasEntry::transform::<Celsius, String, _, _>(
    ///         |c| Ok(format!("{}C", c.0)),
    ///         |s| {
    ///             s.trim_end_matches('C')
    ///                 .parse()
    ///                 .map(Celsius)
    ///                 .map_err(|_| Error::coercion(s, "Celsius"))
    ///         },
    ///     ))
    ///     .build()
    ///     .unwrap();
    /// assert!(atlas.contains(std::any::TypeId::of::<Celsius>()));
    /// ```
    pub fn transform<T, S, F, G>(to: F, from: G) -> Self
    where
        T: Any,
        S: ScalarValue,
        F: Fn(&T) -> Result<S> + Send + Sync + 'static,
        G: Fn(S) -> Result<T> + Send + Sync + 'static,
    {
        let kind = EntryKind::Scalar(ScalarEntry {
            expected: S::EXPECTED,
            encode: Box::new(move |v: &dyn Any| -> Result<Token> {
                let t = v.downcast_ref::<T>().ok_or_else(Error::entry_mismatch::<T>)?;
                to(t).map(|s| s.to_token())
            }),
            decode: Box::new(move |tok: Token| -> Result<Box<dyn Any>> {
                let s = S::from_token(tok)?;
                from(s).map(|t| Box::new(t) as Box<dyn Any>)
            }),
        });
        AtlasEntry::new::<T>(TypeRef::of::<T>(), kind)
    }

    /// Nullable indirection: `None` maps to a null token.
    pub(crate) fn option<T: Natural>() -> Self {
        let kind = EntryKind::Optional(OptionalEntry {
            inner: TypeRef::natural::<T>(),
            get: optional_getter(|v| {
                v.downcast_ref::<Option<T>>()
                    .map(|o| o.as_ref().map(|t| t as &dyn Any))
            }),
            wrap: Box::new(|x: Box<dyn Any>| -> Result<Box<dyn Any>> {
                Ok(Box::new(Some(downcast::<T>(x)?)))
            }),
            none: Some(new_none::<T>),
        });
        AtlasEntry::new::<Option<T>>(TypeRef::of::<Option<T>>(), kind)
    }

    /// Non-nullable indirection: tokens pass straight through to `T`.
    pub(crate) fn boxed<T: Natural>() -> Self {
        let kind = EntryKind::Optional(OptionalEntry {
            inner: TypeRef::natural::<T>(),
            get: optional_getter(|v| v.downcast_ref::<Box<T>>().map(|b| Some(&**b as &dyn Any))),
            wrap: Box::new(|x: Box<dyn Any>| -> Result<Box<dyn Any>> {
                Ok(Box::new(Box::new(downcast::<T>(x)?)))
            }),
            none: None,
        });
        AtlasEntry::new::<Box<T>>(TypeRef::of::<Box<T>>(), kind)
    }

    pub(crate) fn wildcard<T: Any>(entry: WildcardEntry) -> Self {
        AtlasEntry::new::<T>(TypeRef::of::<T>(), EntryKind::Wildcard(entry))
    }

    /// The type this entry describes.
    #[must_use]
    pub fn ty(&self) -> TypeRef {
        self.ty
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.ty.name()
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        match self.kind {
            EntryKind::Record(_) => Shape::Record,
            EntryKind::Sequence(_) => Shape::Sequence,
            EntryKind::Map(_) => Shape::Map,
            EntryKind::Scalar(_) => Shape::Scalar,
            EntryKind::Optional(_) => Shape::Optional,
            EntryKind::Wildcard(_) => Shape::Wildcard,
        }
    }

    /// Types this entry hands its children to.
    pub(crate) fn children(&self) -> Vec<TypeRef> {
        match &self.kind {
            EntryKind::Record(rec) => rec.fields.iter().map(|f| f.ty).collect(),
            EntryKind::Sequence(seq) => vec![seq.elem],
            EntryKind::Map(map) => vec![map.value],
            EntryKind::Optional(opt) => vec![opt.inner],
            EntryKind::Wildcard(w) => vec![w.map, w.seq],
            EntryKind::Scalar(_) => Vec::new(),
        }
    }

    pub(crate) fn mismatch(&self) -> Error {
        Error::EntryMismatch {
            expected: self.ty.name(),
        }
    }
}

impl fmt::Debug for AtlasEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("AtlasEntry");
        d.field("type", &self.ty.name()).field("shape", &self.shape());
        if let EntryKind::Record(rec) = &self.kind {
            let keys: Vec<&str> = rec.fields.iter().map(|f| f.key.as_str()).collect();
            d.field("fields", &keys);
        }
        d.finish()
    }
}

/// Builder for record entries, returned by [`AtlasEntry::record`].
pub struct RecordBuilder<R> {
    fields: Vec<Field>,
    unknown_keys: Option<UnknownKeys>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Any + Default> RecordBuilder<R> {
    /// Adds a field whose type has a natural mapping (or a registered one).
    #[must_use]
    pub fn field<T, G, S>(self, key: impl Into<String>, get: G, set: S) -> Self
    where
        T: Natural,
        G: Fn(&R) -> &T + Send + Sync + 'static,
        S: Fn(&mut R, T) + Send + Sync + 'static,
    {
        self.push_field(key.into(), TypeRef::natural::<T>(), get, set)
    }

    /// Adds a field whose type is only known to the atlas through an
    /// explicit registration.
    #[must_use]
    pub fn field_registered<T, G, S>(self, key: impl Into<String>, get: G, set: S) -> Self
    where
        T: Any,
        G: Fn(&R) -> &T + Send + Sync + 'static,
        S: Fn(&mut R, T) + Send + Sync + 'static,
    {
        self.push_field(key.into(), TypeRef::of::<T>(), get, set)
    }

    /// Leaves the most recently added field out of the token stream whenever
    /// `pred` holds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::{Atlas, AtlasEntry, Marshaller, Token};
    ///
    /// #[derive(Default)]
    /// struct Tagged { tags: Vec<String> }
    ///
    /// let atlas = Atlas::builder()
    ///     .register(
    ///         AtlasEntry::record::<Tagged>()
    ///             .field("tags", |t| &t.tags, |t, v| t.tags = v)
    ///             .omit_if(|t| t.tags.is_empty())
    ///             .build(),
    ///     )
    ///     .build()
    ///     .unwrap();
    /// let tagged = Tagged::default();
    /// let mut m = Marshaller::new(&atlas);
    /// m.bind_registered(&tagged).unwrap();
    /// assert_eq!(m.step().unwrap(), (Token::MapOpen(Some(0)), false));
    /// assert_eq!(m.step().unwrap(), (Token::MapClose, true));
    /// ```
    #[must_use]
    pub fn omit_if<P>(mut self, pred: P) -> Self
    where
        P: Fn(&R) -> bool + Send + Sync + 'static,
    {
        if let Some(last) = self.fields.last_mut() {
            last.omit = Some(Box::new(move |v: &dyn Any| {
                v.downcast_ref::<R>().is_some_and(&pred)
            }));
        }
        self
    }

    /// Overrides the engine-wide unknown-key policy for this record.
    #[must_use]
    pub fn unknown_keys(mut self, policy: UnknownKeys) -> Self {
        self.unknown_keys = Some(policy);
        self
    }

    #[must_use]
    pub fn build(self) -> AtlasEntry {
        let kind = EntryKind::Record(RecordEntry {
            fields: self.fields,
            new: new_default::<R>,
            unknown_keys: self.unknown_keys,
        });
        AtlasEntry::new::<R>(TypeRef::of::<R>(), kind)
    }

    fn push_field<T, G, S>(mut self, key: String, ty: TypeRef, get: G, set: S) -> Self
    where
        T: Any,
        G: Fn(&R) -> &T + Send + Sync + 'static,
        S: Fn(&mut R, T) + Send + Sync + 'static,
    {
        self.fields.push(Field {
            key,
            ty,
            get: getter(move |v| v.downcast_ref::<R>().map(|r| get(r) as &dyn Any)),
            set: Box::new(move |v: &mut dyn Any, x: Box<dyn Any>| -> Result<()> {
                let r = v.downcast_mut::<R>().ok_or_else(Error::entry_mismatch::<R>)?;
                set(r, downcast::<T>(x)?);
                Ok(())
            }),
            omit: None,
        });
        self
    }
}

// These pin closure signatures to the higher-ranked forms the boxes need.
fn getter<F>(f: F) -> Getter
where
    F: for<'v> Fn(&'v dyn Any) -> Option<&'v dyn Any> + Send + Sync + 'static,
{
    Box::new(f)
}

fn index_getter<F>(f: F) -> IndexGetter
where
    F: for<'v> Fn(&'v dyn Any, usize) -> Option<&'v dyn Any> + Send + Sync + 'static,
{
    Box::new(f)
}

fn optional_getter<F>(f: F) -> OptionalGetter
where
    F: for<'v> Fn(&'v dyn Any) -> Option<Option<&'v dyn Any>> + Send + Sync + 'static,
{
    Box::new(f)
}

fn entries_fn<F>(f: F) -> EntriesFn
where
    F: for<'v> Fn(&'v dyn Any) -> Option<Vec<(String, &'v dyn Any)>> + Send + Sync + 'static,
{
    Box::new(f)
}

pub(crate) fn downcast<T: Any>(value: Box<dyn Any>) -> Result<T> {
    value
        .downcast::<T>()
        .map(|b| *b)
        .map_err(|_| Error::entry_mismatch::<T>())
}

fn assign<T: Any>(slot: &mut dyn Any, value: Box<dyn Any>) -> Result<()> {
    let slot = slot.downcast_mut::<T>().ok_or_else(Error::entry_mismatch::<T>)?;
    *slot = downcast::<T>(value)?;
    Ok(())
}

fn new_default<T: Any + Default>() -> Box<dyn Any> {
    Box::new(T::default())
}

fn new_none<T: Any>() -> Box<dyn Any> {
    Box::new(None::<T>)
}
