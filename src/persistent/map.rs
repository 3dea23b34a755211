//! Persistent (immutable) hash map.
//!
//! This module provides [`PersistentMap`], an immutable key-value map that
//! returns a new version on every `set`/`delete` while sharing every
//! untouched subtree with the previous version.
//!
//! # Overview
//!
//! - O(1) clone
//! - O(depth) `get`, `set`, `delete`; depth is at most 8
//! - O(n) `len`, `depth`, `size` (derived by traversal, never cached, so
//!   shared subtrees carry no per-version state)
//!
//! # Examples
//!
//! ```rust
//! use immutable_amt::persistent::PersistentMap;
//!
//! let empty = PersistentMap::new();
//! assert_eq!(empty.len(), 0);
//! assert_eq!(empty.depth(), 1);
//!
//! let map = empty.set("hello", "world")?;
//! assert_eq!(map.get(&"hello")?, Some(&"world"));
//! assert_eq!(map.to_string(), "{hello:world}");
//!
//! let removed = map.delete(&"hello")?;
//! assert_eq!(removed.len(), 0);
//! assert_eq!(map.len(), 1); // Original unchanged
//! # Ok::<(), immutable_amt::AmtError>(())
//! ```

use std::fmt;
use std::iter::FusedIterator;

use super::ReferenceCounter;
use super::amt::{self, Node};
use crate::error::AmtError;
use crate::hash::{BuiltinHasher, CanonicalHasher, FnHasher, KeyHasher, MarshalHasher};

// =============================================================================
// PersistentMap Definition
// =============================================================================

/// A persistent (immutable) hash map backed by an array mapped trie.
///
/// The map holds a root node and the hashing strategy of its lineage. All
/// operations that hash a key return `Result`, since the strategy may
/// reject a key with [`AmtError::UnsupportedKeyKind`].
///
/// # Time Complexity
///
/// | Operation        | Complexity          |
/// |------------------|---------------------|
/// | `new`            | O(1)                |
/// | `get`            | O(depth)            |
/// | `set`            | O(depth)            |
/// | `delete`         | O(depth)            |
/// | `len`            | O(N)                |
/// | `depth`          | O(N)                |
///
/// Keys whose hashes are fully equal end in a collision bucket, where
/// lookups scan the bucket linearly.
pub struct PersistentMap<K, V, H = BuiltinHasher> {
    root: ReferenceCounter<Node<K, V>>,
    hasher: ReferenceCounter<H>,
}

impl<K, V> PersistentMap<K, V> {
    /// Creates an empty map using the built-in hashing strategy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use immutable_amt::persistent::PersistentMap;
    ///
    /// let map: PersistentMap<String, i32> = PersistentMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(BuiltinHasher::default())
    }
}

impl<K, V, F> PersistentMap<K, V, FnHasher<F>>
where
    F: Fn(&K) -> u32,
{
    /// Creates an empty map hashing keys with `function`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use immutable_amt::persistent::PersistentMap;
    ///
    /// #[derive(Clone, PartialEq, Eq)]
    /// struct Point(i32, i32);
    ///
    /// let map = PersistentMap::with_hash_fn(|point: &Point| (point.0 as u32) ^ (point.1 as u32).rotate_left(16))
    ///     .set(Point(1, 2), "a")?;
    /// assert_eq!(map.get(&Point(1, 2))?, Some(&"a"));
    /// # Ok::<(), immutable_amt::AmtError>(())
    /// ```
    #[must_use]
    pub fn with_hash_fn(function: F) -> Self {
        Self::with_hasher(FnHasher::new(function))
    }
}

impl<K, V, F, C> PersistentMap<K, V, CanonicalHasher<F, C>>
where
    F: Fn(&K) -> (u32, C),
    C: Eq,
{
    /// Creates an empty map whose `function` returns the hash of a key
    /// together with the canonical surrogate that decides key equality.
    ///
    /// Setting a key equal (by surrogate) to a stored one replaces both the
    /// stored key and its value.
    #[must_use]
    pub fn with_canonical_fn(function: F) -> Self {
        Self::with_hasher(CanonicalHasher::new(function))
    }
}

impl<K, V, F> PersistentMap<K, V, MarshalHasher<F>>
where
    F: Fn(&K) -> Option<Vec<u8>>,
{
    /// Creates an empty map that hashes the bytes `function` marshals each
    /// key to. The key itself is stored and compared with `Eq`.
    #[must_use]
    pub fn with_marshal(function: F) -> Self {
        Self::with_hasher(MarshalHasher::new(function))
    }
}

impl<K, V, H> PersistentMap<K, V, H> {
    /// Creates an empty map bound to `hasher` for its whole lineage.
    #[must_use]
    pub fn with_hasher(hasher: H) -> Self {
        Self {
            root: ReferenceCounter::new(Node::empty()),
            hasher: ReferenceCounter::new(hasher),
        }
    }

    /// Returns the hashing strategy shared by this lineage.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Returns the number of entries in the map.
    ///
    /// # Complexity
    ///
    /// O(N): counted by traversal.
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.root.len() == 0
    }

    /// Returns the number of trie levels. An empty map has depth 1.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Returns the bytes spent on the container and its trie structure,
    /// excluding memory owned by the keys and values. Diagnostic only.
    pub fn size(&self) -> usize {
        std::mem::size_of::<Self>() + self.root.size()
    }

    /// Calls `visitor` for every entry until it returns `false`.
    ///
    /// Returns `true` when every entry was visited.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use immutable_amt::persistent::PersistentMap;
    ///
    /// let map = PersistentMap::new().set(1_u8, 'a')?.set(2, 'b')?.set(3, 'c')?;
    /// let mut seen = 0;
    /// let completed = map.range(|_, _| {
    ///     seen += 1;
    ///     seen < 2
    /// });
    /// assert!(!completed);
    /// assert_eq!(seen, 2);
    /// # Ok::<(), immutable_amt::AmtError>(())
    /// ```
    pub fn range<F>(&self, mut visitor: F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.root.foreach(&mut visitor)
    }

    /// Returns an iterator over key-value pairs in traversal order.
    pub fn iter(&self) -> PersistentMapIterator<'_, K, V> {
        PersistentMapIterator {
            inner: self.root.iter(),
        }
    }

    /// Returns an iterator over keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    fn with_root(&self, root: Node<K, V>) -> Self {
        Self {
            root: ReferenceCounter::new(root),
            hasher: ReferenceCounter::clone(&self.hasher),
        }
    }
}

impl<K, V, H: KeyHasher<K>> PersistentMap<K, V, H> {
    /// Returns `true` if an entry with the given key is present.
    ///
    /// # Errors
    ///
    /// Returns [`AmtError::UnsupportedKeyKind`] when the key cannot be hashed.
    pub fn has(&self, key: &K) -> Result<bool, AmtError> {
        Ok(self.lookup(key)?.is_some())
    }

    /// Returns a reference to the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AmtError::UnsupportedKeyKind`] when the key cannot be hashed.
    pub fn get(&self, key: &K) -> Result<Option<&V>, AmtError> {
        Ok(self.lookup(key)?.map(|(_, value)| value))
    }

    /// Returns the stored key and its value.
    ///
    /// The stored key can differ from `key` when the hashing strategy
    /// compares canonical surrogates.
    ///
    /// # Errors
    ///
    /// Returns [`AmtError::UnsupportedKeyKind`] when the key cannot be hashed.
    pub fn lookup(&self, key: &K) -> Result<Option<(&K, &V)>, AmtError> {
        let hash = self.hasher.hash_key(key)?;
        Ok(self.root.lookup(hash, key, &self.equivalence()))
    }

    fn equivalence(&self) -> impl Fn(&K, &K) -> bool + '_ {
        |stored: &K, probe: &K| self.hasher.key_eq(stored, probe)
    }
}

impl<K: Clone, V: Clone, H: KeyHasher<K>> PersistentMap<K, V, H> {
    /// Returns a new map with `key` bound to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`AmtError::UnsupportedKeyKind`] when the key cannot be hashed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use immutable_amt::persistent::PersistentMap;
    ///
    /// let map1 = PersistentMap::new().set("key", 1)?;
    /// let map2 = map1.set("key", 2)?;
    ///
    /// assert_eq!(map1.get(&"key")?, Some(&1)); // Original unchanged
    /// assert_eq!(map2.get(&"key")?, Some(&2)); // New version
    /// # Ok::<(), immutable_amt::AmtError>(())
    /// ```
    pub fn set(&self, key: K, value: V) -> Result<Self, AmtError> {
        let hash = self.hasher.hash_key(&key)?;
        let root = self.root.set(hash, 0, key, value, &self.equivalence());
        Ok(self.with_root(root))
    }

    /// Returns a new map without `key`.
    ///
    /// Deleting an absent key returns a map sharing this map's root.
    ///
    /// # Errors
    ///
    /// Returns [`AmtError::UnsupportedKeyKind`] when the key cannot be hashed.
    pub fn delete(&self, key: &K) -> Result<Self, AmtError> {
        let hash = self.hasher.hash_key(key)?;
        Ok(self
            .root
            .delete(hash, 0, key, &self.equivalence())
            .map_or_else(|| self.clone(), |root| self.with_root(root)))
    }

    /// Returns a new map with every pair from `entries` set in order.
    ///
    /// # Errors
    ///
    /// Stops at the first key that cannot be hashed.
    pub fn set_all<I>(&self, entries: I) -> Result<Self, AmtError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        entries
            .into_iter()
            .try_fold(self.clone(), |map, (key, value)| map.set(key, value))
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over key-value pairs of a [`PersistentMap`].
pub struct PersistentMapIterator<'a, K, V> {
    inner: amt::Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for PersistentMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<K, V> FusedIterator for PersistentMapIterator<'_, K, V> {}

impl<K, V> Clone for PersistentMapIterator<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V, H> IntoIterator for &'a PersistentMap<K, V, H> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V, H> Clone for PersistentMap<K, V, H> {
    fn clone(&self) -> Self {
        Self {
            root: ReferenceCounter::clone(&self.root),
            hasher: ReferenceCounter::clone(&self.hasher),
        }
    }
}

impl<K, V> Default for PersistentMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V: PartialEq, H: KeyHasher<K>> PartialEq for PersistentMap<K, V, H> {
    fn eq(&self, other: &Self) -> bool {
        if ReferenceCounter::ptr_eq(&self.root, &other.root) {
            return true;
        }
        self.len() == other.len()
            && self.iter().all(|(key, value)| {
                matches!(other.get(key), Ok(Some(other_value)) if other_value == value)
            })
    }
}

impl<K, V: Eq, H: KeyHasher<K>> Eq for PersistentMap<K, V, H> {}

/// Renders `{key1:value1, key2:value2}` in traversal order. For debugging
/// only; the order is not stable across differently built maps.
impl<K: fmt::Display, V: fmt::Display, H> fmt::Display for PersistentMap<K, V, H> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("{")?;
        for (position, (key, value)) in self.iter().enumerate() {
            if position > 0 {
                formatter.write_str(", ")?;
            }
            write!(formatter, "{key}:{value}")?;
        }
        formatter.write_str("}")
    }
}

impl<K: fmt::Debug, V: fmt::Debug, H> fmt::Debug for PersistentMap<K, V, H> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(PersistentMap<String, i32>: Send, Sync, Clone);

#[cfg(not(feature = "arc"))]
static_assertions::assert_not_impl_any!(PersistentMap<String, i32>: Send, Sync);

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K, V, H> serde::Serialize for PersistentMap<K, V, H>
where
    K: serde::Serialize,
    V: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_map(self.iter())
    }
}

#[cfg(feature = "serde")]
struct PersistentMapVisitor<K, V> {
    marker: std::marker::PhantomData<(K, V)>,
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for PersistentMapVisitor<K, V>
where
    K: serde::Deserialize<'de> + std::any::Any + Clone + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    type Value = PersistentMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut map = PersistentMap::new();
        while let Some((key, value)) = access.next_entry()? {
            map = map.set(key, value).map_err(serde::de::Error::custom)?;
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for PersistentMap<K, V>
where
    K: serde::Deserialize<'de> + std::any::Any + Clone + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentMapVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
