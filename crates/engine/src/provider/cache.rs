//! Provider-scoped memoization.
//!
//! A [`Cache`] lives for one provider execution: it is shared by every field
//! of that provider across every document, then dropped. Entries are keyed
//! by key value together with the key and value types, so unrelated lookups
//! cannot collide.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    error::Error as StdError,
    fmt,
    hash::Hash,
    sync::Arc,
};

type Slot<K, V> = HashMap<K, Result<V, CacheError>>;

/// Memoized `(value, error)` results of expensive lookups.
#[derive(Default)]
pub struct Cache {
    slots: HashMap<TypeId, Box<dyn Any>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for `key`, running `loader` on the first lookup only.
    ///
    /// Failures are cached as well: once a loader errors, every later lookup
    /// of the same key returns that error without calling a loader again.
    pub fn get_or_load<K, V, F>(&mut self, key: K, loader: F) -> Result<V, CacheError>
    where
        K: Hash + Eq + 'static,
        V: Clone + 'static,
        F: FnOnce() -> anyhow::Result<V>,
    {
        let slot = self
            .slots
            .entry(TypeId::of::<Slot<K, V>>())
            .or_insert_with(|| Box::new(Slot::<K, V>::new()))
            .downcast_mut::<Slot<K, V>>()
            .expect("cache slot type matches its type id");

        if let Some(result) = slot.get(&key) {
            return result.clone();
        }

        let result = loader().map_err(CacheError::from);
        slot.insert(key, result.clone());
        result
    }

    /// Cached result for `key`, if a loader already ran for it.
    pub fn get<K, V>(&self, key: &K) -> Option<Result<V, CacheError>>
    where
        K: Hash + Eq + 'static,
        V: Clone + 'static,
    {
        self.slots
            .get(&TypeId::of::<Slot<K, V>>())?
            .downcast_ref::<Slot<K, V>>()?
            .get(key)
            .cloned()
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache").field("slot_count", &self.slots.len()).finish()
    }
}

/// Loader failure shared by every lookup of the same key.
#[derive(Clone)]
pub struct CacheError(Arc<anyhow::Error>);

impl CacheError {
    /// The error returned by the loader.
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }
}

impl From<anyhow::Error> for CacheError {
    fn from(error: anyhow::Error) -> Self {
        Self(Arc::new(error))
    }
}

impl fmt::Debug for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl StdError for CacheError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}
