//! Pieces shared by both frame machines.

use crate::atlas::{Atlas, AtlasEntry, TypeRef};
use crate::{Error, Result};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Lifecycle of a bound run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Unbound,
    Running,
    Done,
    /// A step failed; the run is abandoned until the next bind.
    Failed,
}

impl Phase {
    /// Checks that a step may be issued.
    pub(crate) fn ready(self) -> Result<()> {
        match self {
            Phase::Running => Ok(()),
            Phase::Done => Err(Error::Overshoot),
            Phase::Unbound | Phase::Failed => Err(Error::NotBound),
        }
    }
}

/// Fails if pushing one more frame would exceed `limit`.
pub(crate) fn check_depth(depth: usize, limit: Option<usize>) -> Result<()> {
    match limit {
        Some(limit) if depth >= limit => Err(Error::DepthLimit { limit }),
        _ => Ok(()),
    }
}

/// Resolves types against a frozen atlas for one engine.
///
/// Entries the atlas does not hold are built from the type's natural
/// constructor on first use and kept for the engine's lifetime.
pub(crate) struct Resolver<'a> {
    atlas: &'a Atlas,
    built: HashMap<TypeId, Arc<AtlasEntry>>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(atlas: &'a Atlas) -> Self {
        Resolver {
            atlas,
            built: HashMap::new(),
        }
    }

    pub(crate) fn resolve(&mut self, ty: &TypeRef) -> Result<Arc<AtlasEntry>> {
        if let Some(entry) = self.atlas.lookup(ty) {
            return Ok(entry);
        }
        if let Some(entry) = self.built.get(&ty.id()) {
            return Ok(Arc::clone(entry));
        }
        let entry = ty
            .natural_entry()
            .map(Arc::new)
            .ok_or(Error::NotFound { type_name: ty.name() })?;
        tracing::trace!(ty = ty.name(), "built natural entry");
        self.built.insert(ty.id(), Arc::clone(&entry));
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::Natural;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static BUILT: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct Gauge {
        n: u8,
    }

    impl Natural for Gauge {
        fn natural() -> AtlasEntry {
            BUILT.fetch_add(1, Ordering::SeqCst);
            AtlasEntry::record::<Gauge>()
                .field("n", |p| &p.n, |p, v| p.n = v)
                .build()
        }
    }

    #[test]
    fn test_resolver_builds_fallback_once() {
        let atlas = Atlas::new();
        let mut resolver = Resolver::new(&atlas);
        let first = resolver.resolve(&TypeRef::natural::<Gauge>()).unwrap();
        let second = resolver.resolve(&TypeRef::natural::<Gauge>()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);

        struct Unmapped;
        let err = resolver.resolve(&TypeRef::of::<Unmapped>()).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_resolver_prefers_atlas_entries() {
        let atlas = Atlas::new();
        let mut resolver = Resolver::new(&atlas);
        let entry = resolver.resolve(&TypeRef::natural::<String>()).unwrap();
        let held = atlas.lookup(&TypeRef::natural::<String>()).unwrap();
        assert!(Arc::ptr_eq(&entry, &held));
        assert!(resolver.built.is_empty());
    }

    #[test]
    fn test_phase_gate() {
        assert!(Phase::Running.ready().is_ok());
        assert_eq!(Phase::Done.ready(), Err(Error::Overshoot));
        assert_eq!(Phase::Unbound.ready(), Err(Error::NotBound));
        assert_eq!(Phase::Failed.ready(), Err(Error::NotBound));
    }

    #[test]
    fn test_depth_guard() {
        assert!(check_depth(3, Some(4)).is_ok());
        assert_eq!(check_depth(4, Some(4)), Err(Error::DepthLimit { limit: 4 }));
        assert!(check_depth(10_000, None).is_ok());
    }
}
