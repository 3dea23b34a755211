//! Persistent keyed-record store.
//!
//! A [`PersistentStore`] takes whole records and files each one under the
//! key its split function extracts. Lookups and deletes also go through a
//! record, so callers can probe with a partially filled record.

use std::fmt;
use std::marker::PhantomData;

use super::ReferenceCounter;
use super::map::{PersistentMap, PersistentMapIterator};
use crate::error::AmtError;
use crate::hash::{BuiltinHasher, KeyHasher};

/// A persistent map from records of type `D` split into `(K, V)` by `S`.
///
/// # Examples
///
/// ```rust
/// use immutable_amt::persistent::PersistentStore;
///
/// struct Country {
///     code: &'static str,
///     name: &'static str,
/// }
///
/// let store = PersistentStore::with_splitter(|country: &Country| (country.code, country.name))
///     .put(Country { code: "NL", name: "Netherlands" })?
///     .put(Country { code: "BE", name: "Belgium" })?;
///
/// let probe = Country { code: "NL", name: "" };
/// assert_eq!(store.get(&probe)?, Some(&"Netherlands"));
/// assert_eq!(store.delete(&probe)?.len(), 1);
/// # Ok::<(), immutable_amt::AmtError>(())
/// ```
pub struct PersistentStore<D, K, V, S, H = BuiltinHasher> {
    map: PersistentMap<K, V, H>,
    split: ReferenceCounter<S>,
    marker: PhantomData<fn(&D)>,
}

impl<D, K, V, S> PersistentStore<D, K, V, S>
where
    S: Fn(&D) -> (K, V),
{
    /// Creates an empty store using the built-in hashing strategy.
    #[must_use]
    pub fn with_splitter(split: S) -> Self {
        Self::with_splitter_and_hasher(split, BuiltinHasher::default())
    }
}

impl<D, K, V, S, H> PersistentStore<D, K, V, S, H>
where
    S: Fn(&D) -> (K, V),
{
    /// Creates an empty store hashing the extracted keys with `hasher`.
    #[must_use]
    pub fn with_splitter_and_hasher(split: S, hasher: H) -> Self {
        Self {
            map: PersistentMap::with_hasher(hasher),
            split: ReferenceCounter::new(split),
            marker: PhantomData,
        }
    }
}

impl<D, K, V, S, H> PersistentStore<D, K, V, S, H> {
    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of trie levels. An empty store has depth 1.
    pub fn depth(&self) -> usize {
        self.map.depth()
    }

    /// Returns the bytes spent on the container and its trie structure.
    pub fn size(&self) -> usize {
        std::mem::size_of::<Self>() - std::mem::size_of::<PersistentMap<K, V, H>>() + self.map.size()
    }

    /// Calls `visitor` for every key-value pair until it returns `false`.
    ///
    /// Returns `true` when every pair was visited.
    pub fn range<F>(&self, visitor: F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.map.range(visitor)
    }

    /// Returns an iterator over the split key-value pairs.
    pub fn iter(&self) -> PersistentMapIterator<'_, K, V> {
        self.map.iter()
    }

    /// Returns the stored pairs as a map sharing this store's trie.
    pub fn as_map(&self) -> &PersistentMap<K, V, H> {
        &self.map
    }
}

impl<D, K, V, S, H> PersistentStore<D, K, V, S, H>
where
    S: Fn(&D) -> (K, V),
    H: KeyHasher<K>,
{
    /// Returns `true` if a record with the key of `record` is stored.
    ///
    /// # Errors
    ///
    /// Returns [`AmtError::UnsupportedKeyKind`] when the key cannot be hashed.
    pub fn has(&self, record: &D) -> Result<bool, AmtError> {
        let (key, _) = (self.split)(record);
        self.map.has(&key)
    }

    /// Returns the value stored under the key of `record`.
    ///
    /// # Errors
    ///
    /// Returns [`AmtError::UnsupportedKeyKind`] when the key cannot be hashed.
    pub fn get(&self, record: &D) -> Result<Option<&V>, AmtError> {
        let (key, _) = (self.split)(record);
        self.map.get(&key)
    }
}

impl<D, K, V, S, H> PersistentStore<D, K, V, S, H>
where
    K: Clone,
    V: Clone,
    S: Fn(&D) -> (K, V),
    H: KeyHasher<K>,
{
    /// Returns a new store with `record` split and filed under its key.
    ///
    /// # Errors
    ///
    /// Returns [`AmtError::UnsupportedKeyKind`] when the key cannot be hashed.
    pub fn put(&self, record: D) -> Result<Self, AmtError> {
        let (key, value) = (self.split)(&record);
        Ok(self.with_map(self.map.set(key, value)?))
    }

    /// Returns a new store without the record keyed like `record`.
    ///
    /// # Errors
    ///
    /// Returns [`AmtError::UnsupportedKeyKind`] when the key cannot be hashed.
    pub fn delete(&self, record: &D) -> Result<Self, AmtError> {
        let (key, _) = (self.split)(record);
        Ok(self.with_map(self.map.delete(&key)?))
    }

    fn with_map(&self, map: PersistentMap<K, V, H>) -> Self {
        Self {
            map,
            split: ReferenceCounter::clone(&self.split),
            marker: PhantomData,
        }
    }
}

impl<D, K, V, S, H> Clone for PersistentStore<D, K, V, S, H> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
            split: ReferenceCounter::clone(&self.split),
            marker: PhantomData,
        }
    }
}

impl<D, K: fmt::Display, V: fmt::Display, S, H> fmt::Display for PersistentStore<D, K, V, S, H> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.map, formatter)
    }
}

impl<D, K: fmt::Debug, V: fmt::Debug, S, H> fmt::Debug for PersistentStore<D, K, V, S, H> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PersistentStore")
            .field("entries", &self.map)
            .finish_non_exhaustive()
    }
}
