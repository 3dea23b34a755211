//! Array mapped trie engine.
//!
//! This module contains the node type shared by every container in the
//! crate together with the copy-on-write algorithms that operate on it.
//! Nothing here knows how keys are hashed: callers pass in the 32-bit hash
//! and a key equivalence, and receive a new [`Node`] for every mutation.
//!
//! # Internal Structure
//!
//! - 32-way branching (5 hash bits per level)
//! - A 32-bit bitmap marks populated slots; entries are densely packed in
//!   ascending bit order, so a slot's array index is the popcount of the
//!   bitmap bits below it
//! - Once 7 levels (35 bits) have been consumed no hash bits remain and the
//!   node becomes a flat collision bucket compared by key equality
//! - Structural sharing via `ReferenceCounter` (`Rc` or `Arc`)

use std::mem;
use std::slice;

use smallvec::SmallVec;

use super::ReferenceCounter;

// =============================================================================
// Constants
// =============================================================================

/// Hash bits consumed per trie level.
pub(crate) const CHUNK_SIZE: u32 = 5;

/// Shift at which the hash is exhausted and nodes become collision buckets.
pub(crate) const MAX_SHIFT: u32 = 35;

/// Maximum number of nodes on any root-to-leaf path (7 bitmap levels and a bucket).
pub(crate) const MAX_DEPTH: usize = 8;

// =============================================================================
// Bit indexing
// =============================================================================

/// Returns the single-bit mask selecting the slot for `hash` at `shift`.
#[inline]
pub(crate) const fn bitpos(hash: u32, shift: u32) -> u32 {
    1 << ((hash >> shift) & 0x1f)
}

/// Returns the physical index of the slot selected by `bitpos`.
///
/// This is the number of populated slots below the target bit, which is
/// also the insertion point when the slot is still empty.
#[inline]
pub(crate) const fn slot_index(bitmap: u32, bitpos: u32) -> usize {
    (bitmap & (bitpos - 1)).count_ones() as usize
}

#[inline]
const fn is_bucket(shift: u32) -> bool {
    shift >= MAX_SHIFT
}

// =============================================================================
// Node Definition
// =============================================================================

/// A populated slot of a [`Node`].
#[derive(Clone)]
pub(crate) enum Entry<K, V> {
    /// A key-value pair together with the hash it was placed by.
    Leaf { hash: u32, key: K, value: V },
    /// A child node discriminating the next 5 bits of the hash.
    Branch(ReferenceCounter<Node<K, V>>),
}

/// A trie node: a bitmap and the packed entries it describes.
///
/// Below the collision depth `bitmap.count_ones() == entries.len()`.
/// Inside a collision bucket the bitmap is always zero and `entries` holds
/// leaves in insertion order.
pub(crate) struct Node<K, V> {
    bitmap: u32,
    entries: Box<[Entry<K, V>]>,
}

/// Result of shrinking a child after a delete.
enum Collapsed<K, V> {
    Empty,
    Leaf(Entry<K, V>),
    Node(Node<K, V>),
}

impl<K, V> Node<K, V> {
    /// Creates a node with no entries.
    pub(crate) fn empty() -> Self {
        Self {
            bitmap: 0,
            entries: Box::default(),
        }
    }

    #[cfg(test)]
    pub(crate) const fn bitmap(&self) -> u32 {
        self.bitmap
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[Entry<K, V>] {
        &self.entries
    }

    /// Finds the entry stored under `key`.
    ///
    /// Returns the stored key along with its value so callers that use a
    /// canonical equivalence can observe which key is actually held.
    pub(crate) fn lookup<'a, E>(&'a self, hash: u32, key: &K, equivalent: &E) -> Option<(&'a K, &'a V)>
    where
        E: Fn(&K, &K) -> bool,
    {
        let mut node = self;
        let mut shift = 0;
        loop {
            if is_bucket(shift) {
                return node.entries.iter().find_map(|entry| match entry {
                    Entry::Leaf {
                        key: stored, value, ..
                    } if equivalent(stored, key) => Some((stored, value)),
                    _ => None,
                });
            }

            let bit = bitpos(hash, shift);
            if node.bitmap & bit == 0 {
                return None;
            }

            match &node.entries[slot_index(node.bitmap, bit)] {
                Entry::Leaf {
                    hash: stored_hash,
                    key: stored,
                    value,
                } => {
                    return (*stored_hash == hash && equivalent(stored, key)).then_some((stored, value));
                }
                Entry::Branch(child) => {
                    node = &**child;
                    shift += CHUNK_SIZE;
                }
            }
        }
    }

    /// Visits every leaf depth-first in slot order.
    ///
    /// Stops as soon as `visitor` returns `false` and reports whether the
    /// traversal ran to completion.
    pub(crate) fn foreach<F>(&self, visitor: &mut F) -> bool
    where
        F: FnMut(&K, &V) -> bool,
    {
        for entry in self.entries.iter() {
            let keep_going = match entry {
                Entry::Leaf { key, value, .. } => visitor(key, value),
                Entry::Branch(child) => child.foreach(visitor),
            };
            if !keep_going {
                return false;
            }
        }
        true
    }

    /// Counts the leaves reachable from this node.
    ///
    /// Every entry counts once, except that a branch contributes its
    /// child's full leaf count instead of itself.
    pub(crate) fn len(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                Entry::Leaf { .. } => 1,
                Entry::Branch(child) => child.len(),
            })
            .sum()
    }

    /// Number of levels on the longest path, counting this node. An empty
    /// node has depth 1.
    pub(crate) fn depth(&self) -> usize {
        1 + self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Branch(child) => Some(child.depth()),
                Entry::Leaf { .. } => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Bytes spent on node headers and entry slots, excluding whatever
    /// memory the keys and values own.
    pub(crate) fn size(&self) -> usize {
        let own = mem::size_of::<Self>() + self.entries.len() * mem::size_of::<Entry<K, V>>();
        own + self
            .entries
            .iter()
            .map(|entry| match entry {
                Entry::Branch(child) => child.size(),
                Entry::Leaf { .. } => 0,
            })
            .sum::<usize>()
    }

    /// Returns a borrowing iterator over every leaf, in traversal order.
    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        let mut stack = SmallVec::new();
        stack.push(self.entries.iter());
        Iter { stack }
    }

    fn into_collapsed(self) -> Collapsed<K, V> {
        let single_leaf = matches!(&*self.entries, [Entry::Leaf { .. }]);
        if self.entries.is_empty() {
            Collapsed::Empty
        } else if single_leaf {
            self.entries
                .into_vec()
                .pop()
                .map_or(Collapsed::Empty, Collapsed::Leaf)
        } else {
            Collapsed::Node(self)
        }
    }
}

impl<K: Clone, V: Clone> Node<K, V> {
    /// Returns a copy of this node with `key` bound to `value`.
    ///
    /// Only the nodes on the path to the key are copied; every other
    /// subtree is shared with `self`.
    #[must_use]
    pub(crate) fn set<E>(&self, hash: u32, shift: u32, key: K, value: V, equivalent: &E) -> Self
    where
        E: Fn(&K, &K) -> bool,
    {
        if is_bucket(shift) {
            return self.set_in_bucket(hash, key, value, equivalent);
        }

        let bit = bitpos(hash, shift);
        let index = slot_index(self.bitmap, bit);

        if self.bitmap & bit == 0 {
            let mut entries = Vec::with_capacity(self.entries.len() + 1);
            entries.extend_from_slice(&self.entries[..index]);
            entries.push(Entry::Leaf { hash, key, value });
            entries.extend_from_slice(&self.entries[index..]);
            return Self {
                bitmap: self.bitmap | bit,
                entries: entries.into_boxed_slice(),
            };
        }

        let replacement = match &self.entries[index] {
            Entry::Leaf {
                hash: stored_hash,
                key: stored,
                value: stored_value,
            } => {
                if *stored_hash == hash && equivalent(stored, &key) {
                    Entry::Leaf { hash, key, value }
                } else {
                    // Both keys share this chunk; push them one level down.
                    let child = Self::empty()
                        .set(
                            *stored_hash,
                            shift + CHUNK_SIZE,
                            stored.clone(),
                            stored_value.clone(),
                            equivalent,
                        )
                        .set(hash, shift + CHUNK_SIZE, key, value, equivalent);
                    Entry::Branch(ReferenceCounter::new(child))
                }
            }
            Entry::Branch(child) => Entry::Branch(ReferenceCounter::new(child.set(
                hash,
                shift + CHUNK_SIZE,
                key,
                value,
                equivalent,
            ))),
        };

        self.replacing(index, replacement)
    }

    /// Returns a copy of this node without `key`, or `None` when the key is
    /// absent and nothing needs to change.
    ///
    /// A child left holding a single leaf is pulled up into the parent slot.
    /// This repeats on the way back up, so removing one of two colliding
    /// keys restores a depth-1 trie.
    #[must_use]
    pub(crate) fn delete<E>(&self, hash: u32, shift: u32, key: &K, equivalent: &E) -> Option<Self>
    where
        E: Fn(&K, &K) -> bool,
    {
        if is_bucket(shift) {
            let position = self.entries.iter().position(|entry| {
                matches!(entry, Entry::Leaf { key: stored, .. } if equivalent(stored, key))
            })?;
            return Some(self.removing(position, 0));
        }

        let bit = bitpos(hash, shift);
        if self.bitmap & bit == 0 {
            return None;
        }

        let index = slot_index(self.bitmap, bit);
        match &self.entries[index] {
            Entry::Leaf {
                hash: stored_hash,
                key: stored,
                ..
            } => (*stored_hash == hash && equivalent(stored, key)).then(|| self.removing(index, bit)),
            Entry::Branch(child) => {
                let child = child.delete(hash, shift + CHUNK_SIZE, key, equivalent)?;
                Some(match child.into_collapsed() {
                    Collapsed::Empty => self.removing(index, bit),
                    Collapsed::Leaf(leaf) => self.replacing(index, leaf),
                    Collapsed::Node(child) => {
                        self.replacing(index, Entry::Branch(ReferenceCounter::new(child)))
                    }
                })
            }
        }
    }

    fn set_in_bucket<E>(&self, hash: u32, key: K, value: V, equivalent: &E) -> Self
    where
        E: Fn(&K, &K) -> bool,
    {
        let mut entries = self.entries.to_vec();
        let existing = entries.iter().position(|entry| {
            matches!(entry, Entry::Leaf { key: stored, .. } if equivalent(stored, &key))
        });

        match existing {
            Some(position) => entries[position] = Entry::Leaf { hash, key, value },
            None => {
                entries.push(Entry::Leaf { hash, key, value });
                if entries.len() > 1 {
                    tracing::trace!(hash, bucket_len = entries.len(), "collision bucket grew");
                }
            }
        }

        Self {
            bitmap: 0,
            entries: entries.into_boxed_slice(),
        }
    }

    fn replacing(&self, index: usize, entry: Entry<K, V>) -> Self {
        let mut entries = self.entries.to_vec();
        entries[index] = entry;
        Self {
            bitmap: self.bitmap,
            entries: entries.into_boxed_slice(),
        }
    }

    fn removing(&self, index: usize, bit: u32) -> Self {
        let entries: Vec<_> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != index)
            .map(|(_, entry)| entry.clone())
            .collect();
        Self {
            bitmap: self.bitmap & !bit,
            entries: entries.into_boxed_slice(),
        }
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// Depth-first iterator over the leaves of a trie.
///
/// Holds one slice iterator per level; a trie is never deeper than
/// [`MAX_DEPTH`], so the stack stays inline.
pub(crate) struct Iter<'a, K, V> {
    stack: SmallVec<[slice::Iter<'a, Entry<K, V>>; MAX_DEPTH]>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(level) = self.stack.last_mut() {
            match level.next() {
                Some(Entry::Leaf { key, value, .. }) => return Some((key, value)),
                Some(Entry::Branch(child)) => self.stack.push(child.entries.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
