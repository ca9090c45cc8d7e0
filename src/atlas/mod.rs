//! The type atlas: a frozen table from type identity to [`AtlasEntry`].
//!
//! An [`Atlas`] is built once with [`Atlas::builder`] and then shared by
//! reference across any number of engines. Lookup order in
//! [`Atlas::resolve`]:
//!
//! 1. an entry registered on the builder,
//! 2. a natural entry precomputed at build time,
//! 3. the natural constructor carried by the [`TypeRef`] itself,
//! 4. otherwise [`Error::NotFound`].
//!
//! Precomputation walks every type reachable from the registered entries,
//! the built-in seeds and any [`AtlasBuilder::natural`] seeds. Everything
//! else reaches step 3: a user record passed straight to an engine over
//! [`Atlas::new`], or a type first seen inside a wildcard. Step 3 builds a
//! fresh entry on every call; the engines keep the entries they build this
//! way, so each such type is built once per engine rather than once per
//! value.

mod entry;
mod natural;

pub use entry::{AtlasEntry, Peeled, RecordBuilder, Shape};
pub use natural::{Natural, ScalarValue};

pub(crate) use entry::{EntryKind, WildcardEntry};

use crate::map::Map;
use crate::value::Value;
use crate::{Error, Result};
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Runtime identity of a type, plus its natural entry constructor if it
/// has one.
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
    natural: Option<fn() -> AtlasEntry>,
}

impl TypeRef {
    /// Identity only; the type resolves solely through registration.
    #[must_use]
    pub fn of<T: Any + ?Sized>() -> Self {
        TypeRef {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            natural: None,
        }
    }

    /// Identity plus the natural mapping from `T`'s [`Natural`] impl.
    #[must_use]
    pub fn natural<T: Natural>() -> Self {
        TypeRef {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            natural: Some(T::natural),
        }
    }

    /// The [`TypeId`] this reference stands for. Two references are equal
    /// exactly when their ids are.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::TypeRef;
    /// use std::any::TypeId;
    ///
    /// assert_eq!(TypeRef::of::<u32>().id(), TypeId::of::<u32>());
    /// assert_eq!(TypeRef::of::<u32>(), TypeRef::natural::<u32>());
    /// ```
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The type's name as given by [`std::any::type_name`], used in error
    /// messages.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::TypeRef;
    ///
    /// assert_eq!(TypeRef::natural::<Vec<bool>>().name(), std::any::type_name::<Vec<bool>>());
    /// ```
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn natural_entry(&self) -> Option<AtlasEntry> {
        self.natural.map(|f| f())
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.name).finish()
    }
}

/// Immutable registry of type descriptors.
///
/// # Examples
///
/// ```rust
/// use atlas_tok::{Atlas, AtlasEntry, TypeRef};
///
/// #[derive(Default)]
/// struct Config { name: String, retries: u32 }
///
/// let atlas = Atlas::builder()
///     .register(
///         AtlasEntry::record::<Config>()
///             .field("name", |c| &c.name, |c, v| c.name = v)
///             .field("retries", |c| &c.retries, |c, v| c.retries = v)
///             .build(),
///     )
///     .build()
///     .unwrap();
///
/// let entry = atlas.resolve(&TypeRef::of::<Config>()).unwrap();
/// assert_eq!(entry.type_name(), std::any::type_name::<Config>());
/// ```
pub struct Atlas {
    registered: HashMap<TypeId, Arc<AtlasEntry>>,
    naturals: HashMap<TypeId, Arc<AtlasEntry>>,
}

impl Atlas {
    /// An atlas holding only the built-in natural entries.
    #[must_use]
    pub fn new() -> Self {
        Atlas::default()
    }

    /// Starts an empty [`AtlasBuilder`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::{Atlas, TypeRef};
    ///
    /// let atlas = Atlas::builder().natural::<Vec<String>>().build().unwrap();
    /// assert!(atlas.contains(TypeRef::of::<Vec<String>>().id()));
    /// ```
    #[must_use]
    pub fn builder() -> AtlasBuilder {
        AtlasBuilder::default()
    }

    /// Finds the entry governing values of `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the type is neither registered nor
    /// naturally mapped.
    pub fn resolve(&self, ty: &TypeRef) -> Result<Arc<AtlasEntry>> {
        if let Some(entry) = self.lookup(ty) {
            return Ok(entry);
        }
        ty.natural_entry()
            .map(Arc::new)
            .ok_or(Error::NotFound { type_name: ty.name })
    }

    /// The registered or precomputed entry for `ty`, without falling back to
    /// its natural constructor.
    pub(crate) fn lookup(&self, ty: &TypeRef) -> Option<Arc<AtlasEntry>> {
        self.registered
            .get(&ty.id)
            .or_else(|| self.naturals.get(&ty.id))
            .map(Arc::clone)
    }

    /// Returns `true` if the type has a registered or precomputed entry.
    #[must_use]
    pub fn contains(&self, id: TypeId) -> bool {
        self.registered.contains_key(&id) || self.naturals.contains_key(&id)
    }

    /// Number of distinct types with a registered or precomputed entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registered.len()
            + self
                .naturals
                .keys()
                .filter(|id| !self.registered.contains_key(id))
                .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Atlas {
    fn default() -> Self {
        let (registered, naturals) = precompute(HashMap::new(), Vec::new());
        Atlas {
            registered,
            naturals,
        }
    }
}

impl fmt::Debug for Atlas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atlas")
            .field("registered", &self.registered.len())
            .field("naturals", &self.naturals.len())
            .finish()
    }
}

/// Collects entries for an [`Atlas`]. Returned by [`Atlas::builder`].
#[derive(Default)]
pub struct AtlasBuilder {
    registered: HashMap<TypeId, Arc<AtlasEntry>>,
    seeds: Vec<TypeRef>,
    duplicate: Option<&'static str>,
}

impl AtlasBuilder {
    /// Adds an entry, overriding any natural mapping of its type.
    ///
    /// Registering a second entry for the same type makes [`build`] fail.
    ///
    /// [`build`]: AtlasBuilder::build
    #[must_use]
    pub fn register(mut self, entry: AtlasEntry) -> Self {
        let ty = entry.ty();
        if self.registered.contains_key(&ty.id) {
            self.duplicate.get_or_insert(ty.name);
        } else {
            self.registered.insert(ty.id, Arc::new(entry));
        }
        self
    }

    /// Precomputes the natural entry of `T` and everything reachable from it.
    #[must_use]
    pub fn natural<T: Natural>(mut self) -> Self {
        self.seeds.push(TypeRef::natural::<T>());
        self
    }

    /// Freezes the atlas.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateEntry`] if a type was registered twice.
    pub fn build(self) -> Result<Atlas> {
        if let Some(type_name) = self.duplicate {
            return Err(Error::DuplicateEntry { type_name });
        }
        let (registered, naturals) = precompute(self.registered, self.seeds);
        tracing::debug!(
            registered = registered.len(),
            naturals = naturals.len(),
            "atlas built"
        );
        Ok(Atlas {
            registered,
            naturals,
        })
    }
}

type Table = HashMap<TypeId, Arc<AtlasEntry>>;

fn builtin_seeds() -> Vec<TypeRef> {
    vec![
        TypeRef::natural::<bool>(),
        TypeRef::natural::<i8>(),
        TypeRef::natural::<i16>(),
        TypeRef::natural::<i32>(),
        TypeRef::natural::<i64>(),
        TypeRef::natural::<isize>(),
        TypeRef::natural::<u8>(),
        TypeRef::natural::<u16>(),
        TypeRef::natural::<u32>(),
        TypeRef::natural::<u64>(),
        TypeRef::natural::<usize>(),
        TypeRef::natural::<f32>(),
        TypeRef::natural::<f64>(),
        TypeRef::natural::<char>(),
        TypeRef::natural::<String>(),
        TypeRef::natural::<()>(),
        TypeRef::natural::<Value>(),
        TypeRef::natural::<Map>(),
        TypeRef::natural::<Vec<Value>>(),
    ]
}

/// Walks the child types of every registered entry and seed, building the
/// natural entry of each type not already registered.
fn precompute(registered: Table, seeds: Vec<TypeRef>) -> (Table, Table) {
    let mut naturals = Table::new();
    let mut seen: HashSet<TypeId> = registered.keys().copied().collect();
    let mut pending: Vec<TypeRef> = registered
        .values()
        .flat_map(|entry| entry.children())
        .collect();
    pending.extend(builtin_seeds());
    pending.extend(seeds);

    while let Some(ty) = pending.pop() {
        // Registered-only references are resolved at run time, or not at all.
        if ty.natural.is_none() || !seen.insert(ty.id) {
            continue;
        }
        let Some(entry) = ty.natural_entry() else {
            continue;
        };
        pending.extend(entry.children());
        naturals.insert(ty.id, Arc::new(entry));
    }
    (registered, naturals)
}
