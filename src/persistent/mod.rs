//! Persistent (immutable) containers built on one array mapped trie.
//!
//! Every container in this module is a thin typed wrapper around the same
//! trie engine and a [`KeyHasher`](crate::hash::KeyHasher):
//!
//! - [`PersistentMap`]: key-value map
//! - [`PersistentSet`]: set of keys
//! - [`PersistentStore`]: records split into a key and a value by a caller
//!   function
//!
//! # Structural Sharing
//!
//! `set` and `delete` copy only the nodes on the path to the key and return
//! a new container; every earlier version stays valid and unchanged, and
//! untouched subtrees are shared between versions.
//!
//! # Examples
//!
//! ## `PersistentMap`
//!
//! ```rust
//! use immutable_amt::persistent::PersistentMap;
//!
//! let map = PersistentMap::new()
//!     .set("one".to_string(), 1)?
//!     .set("two".to_string(), 2)?;
//! assert_eq!(map.get(&"one".to_string())?, Some(&1));
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.set("one".to_string(), 100)?;
//! assert_eq!(map.get(&"one".to_string())?, Some(&1));       // Original unchanged
//! assert_eq!(updated.get(&"one".to_string())?, Some(&100)); // New version
//! # Ok::<(), immutable_amt::AmtError>(())
//! ```
//!
//! ## `PersistentSet`
//!
//! ```rust
//! use immutable_amt::persistent::PersistentSet;
//!
//! let set = PersistentSet::new().put(1_u32)?.put(2)?.put(3)?;
//! assert!(set.has(&1)?);
//!
//! let updated = set.delete(&1)?;
//! assert_eq!(set.len(), 3);     // Original unchanged
//! assert_eq!(updated.len(), 2); // New version
//! # Ok::<(), immutable_amt::AmtError>(())
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled (the default), this is
/// `std::sync::Arc`, so containers can be read from many threads at once.
///
/// When the `arc` feature is disabled, this is `std::rc::Rc`, which is
/// cheaper but confines a container lineage to one thread.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod amt;
mod map;
mod set;
mod store;

pub use map::PersistentMap;
pub use map::PersistentMapIterator;
pub use set::PersistentSet;
pub use set::PersistentSetIterator;
pub use store::PersistentStore;

// =============================================================================
// Tests
// =============================================================================
