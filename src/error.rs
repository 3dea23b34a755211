//! Error types for key hashing.
//!
//! Every trie operation is total once a key has been hashed. The only
//! failure is a hashing strategy refusing a key, which surfaces as
//! [`AmtError::UnsupportedKeyKind`] from the operation that hashed it.

/// Represents errors that can occur when hashing a key.
///
/// # Examples
///
/// ```rust
/// use immutable_amt::AmtError;
/// use immutable_amt::persistent::PersistentMap;
///
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Point(i32, i32);
///
/// let map: PersistentMap<Point, &str> = PersistentMap::new();
/// let error = map.set(Point(1, 2), "origin").unwrap_err();
/// assert!(matches!(error, AmtError::UnsupportedKeyKind { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AmtError {
    /// The configured hashing strategy does not recognise the key.
    ///
    /// Raised by the built-in strategy for key types it has no hash for,
    /// and by marshalling strategies whose function rejects a key.
    UnsupportedKeyKind {
        /// The Rust type name of the rejected key.
        type_name: &'static str,
    },
}

impl AmtError {
    pub(crate) fn unsupported_key_kind<K: ?Sized>() -> Self {
        Self::UnsupportedKeyKind {
            type_name: std::any::type_name::<K>(),
        }
    }
}

impl std::fmt::Display for AmtError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedKeyKind { type_name } => {
                write!(formatter, "unsupported key kind: {type_name}")
            }
        }
    }
}

impl std::error::Error for AmtError {}
