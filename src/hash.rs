//! Key hashing strategies.
//!
//! A container binds exactly one [`KeyHasher`] for its whole lineage: every
//! version derived from it through `set`/`delete` shares the same strategy,
//! since switching strategies would strand entries placed by the old one.
//!
//! - [`BuiltinHasher`]: strings, byte sequences and primitive integers
//! - [`FnHasher`]: a caller function producing the 32-bit hash
//! - [`CanonicalHasher`]: a caller function producing the hash and a
//!   comparable surrogate that decides key equality
//! - [`MarshalHasher`]: a caller function turning the key into bytes which
//!   are hashed internally, while the key itself decides equality
//!
//! String and byte hashing goes through the process-wide [`HashSeed`].
//!
//! # Examples
//!
//! ```rust
//! use immutable_amt::hash::{BuiltinHasher, KeyHasher};
//!
//! let hasher = BuiltinHasher::default();
//! assert_eq!(hasher.hash_key(&42_u64), Ok(42));
//! assert_eq!(hasher.hash_key(&"key"), hasher.hash_key(&"key"));
//! assert!(hasher.hash_key(&(1_u8, 2_u8)).is_err());
//! ```

use std::any::Any;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::sync::OnceLock;

use crate::error::AmtError;

// =============================================================================
// KeyHasher
// =============================================================================

/// A strategy mapping keys to 32-bit hashes and deciding key equality.
///
/// Implementations must be consistent: keys for which [`key_eq`] holds must
/// hash to the same value.
///
/// [`key_eq`]: KeyHasher::key_eq
pub trait KeyHasher<K> {
    /// Computes the 32-bit hash of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AmtError::UnsupportedKeyKind`] when the strategy cannot
    /// hash this key.
    fn hash_key(&self, key: &K) -> Result<u32, AmtError>;

    /// Returns `true` when `stored` and `probe` denote the same logical key.
    fn key_eq(&self, stored: &K, probe: &K) -> bool;
}

// =============================================================================
// HashSeed
// =============================================================================

#[cfg(feature = "fxhash")]
type SeedState = rustc_hash::FxBuildHasher;

#[cfg(all(feature = "ahash", not(feature = "fxhash")))]
type SeedState = ahash::RandomState;

#[cfg(not(any(feature = "ahash", feature = "fxhash")))]
type SeedState = std::hash::RandomState;

static PROCESS_SEED: OnceLock<HashSeed> = OnceLock::new();

/// Keyed state used to hash strings and byte sequences.
///
/// The process-wide instance is created on first use and never replaced,
/// so hashes stay stable for as long as the process runs while differing
/// between processes (unless the `fxhash` feature selects the unseeded
/// `FxHasher`).
pub struct HashSeed {
    state: SeedState,
}

impl HashSeed {
    /// Returns the process-wide seed, initialising it on first call.
    pub fn process() -> &'static Self {
        PROCESS_SEED.get_or_init(|| Self {
            state: SeedState::default(),
        })
    }

    /// Hashes a string.
    pub fn hash_str(&self, text: &str) -> u32 {
        self.hash_value(text)
    }

    /// Hashes a byte sequence.
    pub fn hash_bytes(&self, bytes: &[u8]) -> u32 {
        self.hash_value(bytes)
    }

    fn hash_value<T: Hash + ?Sized>(&self, value: &T) -> u32 {
        fold(self.state.hash_one(value))
    }
}

impl fmt::Debug for HashSeed {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("HashSeed").finish_non_exhaustive()
    }
}

/// Folds a 64-bit hash into 32 bits, keeping entropy from both halves.
#[allow(clippy::cast_possible_truncation)]
const fn fold(hash: u64) -> u32 {
    ((hash >> 32) ^ hash) as u32
}

// =============================================================================
// BuiltinHasher
// =============================================================================

/// The default strategy for strings, byte sequences and primitives.
///
/// Recognised key types:
///
/// - `String`, `&'static str`, `Box<str>`: hashed with the process seed
/// - `Vec<u8>`, `Box<[u8]>`: hashed with the process seed
/// - all fixed-width integers, `isize`, `usize`: the value truncated to 32 bits
/// - `char`, `bool`: their scalar value
///
/// Any other key type is rejected with [`AmtError::UnsupportedKeyKind`].
/// Equality is the key's own `Eq`.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinHasher {
    seed: &'static HashSeed,
}

impl BuiltinHasher {
    /// Creates a built-in hasher bound to the given seed.
    pub const fn with_seed(seed: &'static HashSeed) -> Self {
        Self { seed }
    }
}

impl Default for BuiltinHasher {
    fn default() -> Self {
        Self::with_seed(HashSeed::process())
    }
}

impl<K: Any + Eq> KeyHasher<K> for BuiltinHasher {
    fn hash_key(&self, key: &K) -> Result<u32, AmtError> {
        builtin_hash(self.seed, key).ok_or_else(|| {
            let error = AmtError::unsupported_key_kind::<K>();
            tracing::debug!(%error, "built-in hasher rejected key");
            error
        })
    }

    fn key_eq(&self, stored: &K, probe: &K) -> bool {
        stored == probe
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless
)]
fn builtin_hash(seed: &HashSeed, key: &dyn Any) -> Option<u32> {
    macro_rules! truncated {
        ($($kind:ty),*) => {
            $(
                if let Some(value) = key.downcast_ref::<$kind>() {
                    return Some(*value as u32);
                }
            )*
        };
    }

    if let Some(text) = key.downcast_ref::<String>() {
        return Some(seed.hash_str(text));
    }
    if let Some(text) = key.downcast_ref::<&'static str>() {
        return Some(seed.hash_str(text));
    }
    if let Some(text) = key.downcast_ref::<Box<str>>() {
        return Some(seed.hash_str(text));
    }
    if let Some(bytes) = key.downcast_ref::<Vec<u8>>() {
        return Some(seed.hash_bytes(bytes));
    }
    if let Some(bytes) = key.downcast_ref::<Box<[u8]>>() {
        return Some(seed.hash_bytes(bytes));
    }

    truncated!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

    if let Some(character) = key.downcast_ref::<char>() {
        return Some(u32::from(*character));
    }
    if let Some(flag) = key.downcast_ref::<bool>() {
        return Some(u32::from(*flag));
    }
    None
}

// =============================================================================
// Caller-supplied strategies
// =============================================================================

/// A strategy hashing keys with a caller function; equality is the key's
/// own `Eq`.
///
/// # Examples
///
/// ```rust
/// use immutable_amt::hash::{FnHasher, KeyHasher};
///
/// // Every key collides: useful to exercise collision buckets.
/// let hasher = FnHasher::new(|_: &String| 7);
/// assert_eq!(hasher.hash_key(&"anything".to_string()), Ok(7));
/// ```
#[derive(Clone, Copy)]
pub struct FnHasher<F> {
    function: F,
}

impl<F> FnHasher<F> {
    /// Wraps a hash function.
    pub const fn new<K>(function: F) -> Self
    where
        F: Fn(&K) -> u32,
    {
        Self { function }
    }
}

impl<K: Eq, F: Fn(&K) -> u32> KeyHasher<K> for FnHasher<F> {
    fn hash_key(&self, key: &K) -> Result<u32, AmtError> {
        Ok((self.function)(key))
    }

    fn key_eq(&self, stored: &K, probe: &K) -> bool {
        stored == probe
    }
}

impl<F> fmt::Debug for FnHasher<F> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("FnHasher").finish_non_exhaustive()
    }
}

/// A strategy whose function returns both the hash and a canonical
/// surrogate of the key; two keys are equal when their surrogates are.
///
/// # Examples
///
/// ```rust
/// use immutable_amt::hash::{CanonicalHasher, KeyHasher};
///
/// // Case-insensitive keys.
/// let hasher = CanonicalHasher::new(|key: &String| {
///     let lower = key.to_lowercase();
///     (lower.len() as u32, lower)
/// });
/// assert!(hasher.key_eq(&"Key".to_string(), &"KEY".to_string()));
/// ```
///
/// `key_eq` runs the function on both keys. Containers only call it for a
/// stored key whose hash equals the searched key's, so outside collision
/// buckets a lookup pays for at most one comparison.
pub struct CanonicalHasher<F, C> {
    function: F,
    marker: PhantomData<fn() -> C>,
}

impl<F, C> CanonicalHasher<F, C> {
    /// Wraps a function producing `(hash, canonical key)`.
    pub fn new<K>(function: F) -> Self
    where
        F: Fn(&K) -> (u32, C),
    {
        Self {
            function,
            marker: PhantomData,
        }
    }
}

impl<K, C: Eq, F: Fn(&K) -> (u32, C)> KeyHasher<K> for CanonicalHasher<F, C> {
    fn hash_key(&self, key: &K) -> Result<u32, AmtError> {
        Ok((self.function)(key).0)
    }

    fn key_eq(&self, stored: &K, probe: &K) -> bool {
        (self.function)(stored).1 == (self.function)(probe).1
    }
}

impl<F, C> fmt::Debug for CanonicalHasher<F, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("CanonicalHasher").finish_non_exhaustive()
    }
}

/// A strategy that marshals keys to bytes and hashes those bytes with the
/// process seed. The original key is kept and compared with its own `Eq`.
///
/// A function returning `None` rejects the key with
/// [`AmtError::UnsupportedKeyKind`].
pub struct MarshalHasher<F> {
    function: F,
    seed: &'static HashSeed,
}

impl<F> MarshalHasher<F> {
    /// Wraps a marshal function, hashing with the process seed.
    pub fn new<K>(function: F) -> Self
    where
        F: Fn(&K) -> Option<Vec<u8>>,
    {
        Self {
            function,
            seed: HashSeed::process(),
        }
    }
}

impl<K: Eq, F: Fn(&K) -> Option<Vec<u8>>> KeyHasher<K> for MarshalHasher<F> {
    fn hash_key(&self, key: &K) -> Result<u32, AmtError> {
        match (self.function)(key) {
            Some(bytes) => Ok(self.seed.hash_bytes(&bytes)),
            None => {
                let error = AmtError::unsupported_key_kind::<K>();
                tracing::debug!(%error, "marshal function rejected key");
                Err(error)
            }
        }
    }

    fn key_eq(&self, stored: &K, probe: &K) -> bool {
        stored == probe
    }
}

impl<F> fmt::Debug for MarshalHasher<F> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("MarshalHasher").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
