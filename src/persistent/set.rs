//! Persistent (immutable) hash set.
//!
//! [`PersistentSet`] is a [`PersistentMap`] whose values are `()`. It
//! shares the map's trie, hashing strategies and structural sharing.
//!
//! # Examples
//!
//! ```rust
//! use immutable_amt::persistent::PersistentSet;
//!
//! let set = PersistentSet::new().put("a")?.put("b")?.put("a")?;
//! assert_eq!(set.len(), 2);
//! assert!(set.has(&"b")?);
//! # Ok::<(), immutable_amt::AmtError>(())
//! ```

use std::fmt;
use std::iter::FusedIterator;

use super::map::{PersistentMap, PersistentMapIterator};
use crate::error::AmtError;
use crate::hash::{BuiltinHasher, FnHasher, KeyHasher};

/// A persistent (immutable) hash set backed by an array mapped trie.
pub struct PersistentSet<K, H = BuiltinHasher> {
    map: PersistentMap<K, (), H>,
}

impl<K> PersistentSet<K> {
    /// Creates an empty set using the built-in hashing strategy.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: PersistentMap::new(),
        }
    }
}

impl<K, F> PersistentSet<K, FnHasher<F>>
where
    F: Fn(&K) -> u32,
{
    /// Creates an empty set hashing members with `function`.
    #[must_use]
    pub fn with_hash_fn(function: F) -> Self {
        Self::with_hasher(FnHasher::new(function))
    }
}

impl<K, H> PersistentSet<K, H> {
    /// Creates an empty set bound to `hasher` for its whole lineage.
    #[must_use]
    pub fn with_hasher(hasher: H) -> Self {
        Self {
            map: PersistentMap::with_hasher(hasher),
        }
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of trie levels. An empty set has depth 1.
    pub fn depth(&self) -> usize {
        self.map.depth()
    }

    /// Returns the bytes spent on the container and its trie structure.
    pub fn size(&self) -> usize {
        self.map.size()
    }

    /// Calls `visitor` for every member until it returns `false`.
    ///
    /// Returns `true` when every member was visited.
    pub fn range<F>(&self, mut visitor: F) -> bool
    where
        F: FnMut(&K) -> bool,
    {
        self.map.range(|key, ()| visitor(key))
    }

    /// Returns an iterator over members in traversal order.
    pub fn iter(&self) -> PersistentSetIterator<'_, K> {
        PersistentSetIterator {
            inner: self.map.iter(),
        }
    }
}

impl<K, H: KeyHasher<K>> PersistentSet<K, H> {
    /// Returns `true` if `key` is a member.
    ///
    /// # Errors
    ///
    /// Returns [`AmtError::UnsupportedKeyKind`] when the key cannot be hashed.
    pub fn has(&self, key: &K) -> Result<bool, AmtError> {
        self.map.has(key)
    }
}

impl<K: Clone, H: KeyHasher<K>> PersistentSet<K, H> {
    /// Returns a new set with `key` added.
    ///
    /// # Errors
    ///
    /// Returns [`AmtError::UnsupportedKeyKind`] when the key cannot be hashed.
    pub fn put(&self, key: K) -> Result<Self, AmtError> {
        Ok(Self {
            map: self.map.set(key, ())?,
        })
    }

    /// Returns a new set without `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AmtError::UnsupportedKeyKind`] when the key cannot be hashed.
    pub fn delete(&self, key: &K) -> Result<Self, AmtError> {
        Ok(Self {
            map: self.map.delete(key)?,
        })
    }

    /// Returns a new set with every key from `keys` added.
    ///
    /// # Errors
    ///
    /// Stops at the first key that cannot be hashed.
    pub fn put_all<I>(&self, keys: I) -> Result<Self, AmtError>
    where
        I: IntoIterator<Item = K>,
    {
        Ok(Self {
            map: self.map.set_all(keys.into_iter().map(|key| (key, ())))?,
        })
    }
}

/// An iterator over the members of a [`PersistentSet`].
pub struct PersistentSetIterator<'a, K> {
    inner: PersistentMapIterator<'a, K, ()>,
}

impl<'a, K> Iterator for PersistentSetIterator<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, ())| key)
    }
}

impl<K> FusedIterator for PersistentSetIterator<'_, K> {}

impl<'a, K, H> IntoIterator for &'a PersistentSet<K, H> {
    type Item = &'a K;
    type IntoIter = PersistentSetIterator<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, H> Clone for PersistentSet<K, H> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
        }
    }
}

impl<K> Default for PersistentSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, H: KeyHasher<K>> PartialEq for PersistentSet<K, H> {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

impl<K, H: KeyHasher<K>> Eq for PersistentSet<K, H> {}

/// Renders `{a, b}` in traversal order.
impl<K: fmt::Display, H> fmt::Display for PersistentSet<K, H> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("{")?;
        for (position, key) in self.iter().enumerate() {
            if position > 0 {
                formatter.write_str(", ")?;
            }
            write!(formatter, "{key}")?;
        }
        formatter.write_str("}")
    }
}

impl<K: fmt::Debug, H> fmt::Debug for PersistentSet<K, H> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(PersistentSet<String>: Send, Sync, Clone);

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K: serde::Serialize, H> serde::Serialize for PersistentSet<K, H> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
struct PersistentSetVisitor<K> {
    marker: std::marker::PhantomData<K>,
}

#[cfg(feature = "serde")]
impl<'de, K> serde::de::Visitor<'de> for PersistentSetVisitor<K>
where
    K: serde::Deserialize<'de> + std::any::Any + Clone + Eq,
{
    type Value = PersistentSet<K>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut set = PersistentSet::new();
        while let Some(key) = access.next_element()? {
            set = set.put(key).map_err(serde::de::Error::custom)?;
        }
        Ok(set)
    }
}

#[cfg(feature = "serde")]
impl<'de, K> serde::Deserialize<'de> for PersistentSet<K>
where
    K: serde::Deserialize<'de> + std::any::Any + Clone + Eq,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentSetVisitor {
            marker: std::marker::PhantomData,
        })
    }
}
