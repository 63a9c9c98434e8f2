//! Build cache
//!
//! Memoizes typed builds by resolver, document fingerprint and target shape.
//! The cache is an explicit value owned by the caller; the engine keeps no
//! global state.

use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use super::Resolver;
use super::error::BuildResult;
use super::hydrate::Hydrate;
use super::node::{DocumentId, Node};
use super::registry::Registry;

type CacheKey = (u64, DocumentId, TypeId);

/// Typed build results keyed by resolver, document identity and shape.
///
/// One cache may serve several resolvers; a result is only returned to the
/// resolver that built it.
#[derive(Default)]
pub struct BuildCache {
    entries: Mutex<HashMap<CacheKey, Arc<dyn Any + Send + Sync>>>,
}

impl BuildCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached build of `document` as `T`, building it on a miss.
    ///
    /// The lock is not held while building. When two callers race on the same
    /// key the first stored result is returned to both.
    pub fn get_or_resolve<T, R>(&self, resolver: &Resolver<R>, document: &Node) -> BuildResult<Arc<T>>
    where
        T: Hydrate + Send + Sync + 'static,
        R: Registry,
    {
        let key = (resolver.id(), document.fingerprint(), TypeId::of::<T>());
        if let Some(hit) = self.lookup::<T>(&key) {
            tracing::trace!(document = %key.1, "build cache hit");
            return Ok(hit);
        }

        let built = Arc::new(resolver.resolve_typed::<T>(document.clone())?);
        let stored = self
            .entries
            .lock()
            .entry(key)
            .or_insert_with(|| built.clone() as Arc<dyn Any + Send + Sync>)
            .clone();
        Ok(stored.downcast::<T>().unwrap_or(built))
    }

    fn lookup<T: Send + Sync + 'static>(&self, key: &CacheKey) -> Option<Arc<T>> {
        let entry = self.entries.lock().get(key).cloned()?;
        entry.downcast::<T>().ok()
    }

    /// Drop every shape cached for `document`, for all resolvers. Returns how
    /// many were removed.
    pub fn invalidate(&self, document: &DocumentId) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(_, id, _), _| id != document);
        before - entries.len()
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
