//! # immutable-amt
//!
//! Persistent (immutable) maps, sets and keyed stores built on an array
//! mapped trie.
//!
//! ## Overview
//!
//! Every update returns a new container and leaves the previous one
//! untouched; both versions share every subtree the update did not touch.
//!
//! - **Trie engine**: bitmap-indexed nodes consuming 5 hash bits per level,
//!   with collision buckets once all 32 bits are used
//! - **Hashing strategies**: built-in hashing for strings, byte sequences
//!   and primitives, or caller-supplied hash, canonical-key and marshal
//!   functions
//! - **Containers**: [`PersistentMap`](persistent::PersistentMap),
//!   [`PersistentSet`](persistent::PersistentSet) and
//!   [`PersistentStore`](persistent::PersistentStore)
//!
//! ## Feature Flags
//!
//! - `arc` (default): share nodes through `Arc` so containers are
//!   `Send + Sync`; without it nodes use `Rc`
//! - `serde`: `Serialize`/`Deserialize` for maps and sets
//! - `ahash`: hash strings and bytes with `ahash`
//! - `fxhash`: hash strings and bytes with `rustc-hash` (unseeded)
//!
//! ## Example
//!
//! ```rust
//! use immutable_amt::prelude::*;
//!
//! let map = PersistentMap::new().set("Hello", "World!")?;
//! let map = map.set("Hi", "There!")?;
//! assert_eq!(map.len(), 2);
//! assert_eq!(map.get(&"Hi")?, Some(&"There!"));
//! # Ok::<(), AmtError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use immutable_amt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::AmtError;
    pub use crate::hash::{BuiltinHasher, CanonicalHasher, FnHasher, KeyHasher, MarshalHasher};
    pub use crate::persistent::*;
}

pub mod error;
pub mod hash;
pub mod persistent;

pub use error::AmtError;
