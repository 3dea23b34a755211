//! Unit tests for PersistentMap.
//!
//! Covers construction, lookup, copy-on-write updates, traversal and the
//! derived statistics of the map.

mod common;

use common::{countries, leading_bytes};
use immutable_amt::AmtError;
use immutable_amt::persistent::PersistentMap;
use rstest::rstest;

// =============================================================================
// Empty map
// =============================================================================

#[rstest]
fn test_new_creates_empty_map() {
    let map: PersistentMap<String, i32> = PersistentMap::new();
    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
    assert_eq!(map.depth(), 1);
    assert_eq!(map.iter().count(), 0);
}

#[rstest]
fn test_get_on_empty_map_returns_none() {
    let map: PersistentMap<String, i32> = PersistentMap::new();
    assert_eq!(map.get(&"key".to_string()), Ok(None));
    assert_eq!(map.has(&"key".to_string()), Ok(false));
}

#[rstest]
fn test_default_is_empty() {
    let map: PersistentMap<u64, u64> = PersistentMap::default();
    assert!(map.is_empty());
}

// =============================================================================
// Set and get
// =============================================================================

#[rstest]
fn test_basic_set_get_delete() -> Result<(), AmtError> {
    let empty = PersistentMap::new();
    let with_hello = empty.set("hello".to_string(), "world")?;
    let without_hello = with_hello.delete(&"hello".to_string())?;

    assert_eq!(empty.len(), 0);
    assert_eq!(with_hello.len(), 1);
    assert_eq!(without_hello.len(), 0);
    assert_eq!(with_hello.get(&"hello".to_string())?, Some(&"world"));
    assert_eq!(without_hello.get(&"hello".to_string())?, None);
    Ok(())
}

#[rstest]
fn test_set_multiple_entries() -> Result<(), AmtError> {
    let map = PersistentMap::new()
        .set("one".to_string(), 1)?
        .set("two".to_string(), 2)?
        .set("three".to_string(), 3)?;

    assert_eq!(map.len(), 3);
    assert_eq!(map.get(&"one".to_string())?, Some(&1));
    assert_eq!(map.get(&"two".to_string())?, Some(&2));
    assert_eq!(map.get(&"three".to_string())?, Some(&3));
    assert_eq!(map.get(&"four".to_string())?, None);
    Ok(())
}

#[rstest]
fn test_set_same_key_keeps_length() -> Result<(), AmtError> {
    let first = PersistentMap::new().set("Hello", "World!")?;
    let second = first.set("Hello", "There!")?;

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first.get(&"Hello")?, Some(&"World!"));
    assert_eq!(second.get(&"Hello")?, Some(&"There!"));
    Ok(())
}

#[rstest]
fn test_set_does_not_modify_original() -> Result<(), AmtError> {
    let map1 = PersistentMap::new().set(1_u32, "one")?;
    let map2 = map1.set(2, "two")?;

    assert_eq!(map1.len(), 1);
    assert_eq!(map1.get(&2)?, None);
    assert_eq!(map2.len(), 2);
    assert_eq!(map2.get(&1)?, Some(&"one"));
    Ok(())
}

#[rstest]
fn test_set_all_folds_pairs_in_order() -> Result<(), AmtError> {
    let map = PersistentMap::new().set_all([("a", 1), ("b", 2), ("a", 3)])?;
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&"a")?, Some(&3));
    Ok(())
}

// =============================================================================
// Delete
// =============================================================================

#[rstest]
fn test_delete_absent_key_keeps_contents() -> Result<(), AmtError> {
    let map = PersistentMap::new().set(10_u16, 'x')?.set(20, 'y')?;
    let same = map.delete(&30)?;

    assert_eq!(same, map);
    assert_eq!(same.depth(), map.depth());
    Ok(())
}

#[rstest]
fn test_delete_from_empty_map() -> Result<(), AmtError> {
    let map: PersistentMap<u8, u8> = PersistentMap::new();
    assert!(map.delete(&1)?.is_empty());
    Ok(())
}

#[rstest]
fn test_delete_does_not_modify_original() -> Result<(), AmtError> {
    let map = PersistentMap::new().set_all((0_u32..100).map(|key| (key, key * 2)))?;
    let deleted = map.delete(&50)?;

    assert_eq!(map.len(), 100);
    assert_eq!(map.get(&50)?, Some(&100));
    assert_eq!(deleted.len(), 99);
    assert_eq!(deleted.get(&50)?, None);
    Ok(())
}

// =============================================================================
// Country table
// =============================================================================

#[rstest]
fn test_countries_by_index_have_depth_two() -> Result<(), AmtError> {
    let table = countries();
    let map = table
        .iter()
        .enumerate()
        .try_fold(PersistentMap::new(), |map, (index, country)| map.set(index, country.clone()))?;

    assert_eq!(map.len(), table.len());
    assert_eq!(map.depth(), 2);
    Ok(())
}

#[rstest]
fn test_countries_insert_lookup_delete_all() -> Result<(), AmtError> {
    let table = countries();
    let map = PersistentMap::new().set_all(table.iter().map(|country| (country.name.to_string(), country.code)))?;

    assert_eq!(map.len(), 175);
    for country in &table {
        assert_eq!(map.get(&country.name.to_string())?, Some(&country.code));
    }

    let emptied = table
        .iter()
        .try_fold(map.clone(), |map, country| map.delete(&country.name.to_string()))?;
    assert!(emptied.is_empty());
    assert_eq!(emptied.depth(), 1);
    assert_eq!(map.len(), 175);
    Ok(())
}

// =============================================================================
// Traversal
// =============================================================================

#[rstest]
fn test_range_visits_every_entry() -> Result<(), AmtError> {
    let map = PersistentMap::new().set_all((0_u64..500).map(|key| (key, key)))?;
    let mut sum = 0;
    let completed = map.range(|key, value| {
        assert_eq!(key, value);
        sum += key;
        true
    });

    assert!(completed);
    assert_eq!(sum, (0..500).sum::<u64>());
    Ok(())
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(64)]
fn test_range_stops_when_visitor_returns_false(#[case] limit: usize) -> Result<(), AmtError> {
    let map = PersistentMap::new().set_all((0_u32..200).map(|key| (key, ())))?;
    let mut visited = 0;
    let completed = map.range(|_, ()| {
        visited += 1;
        visited < limit
    });

    assert!(!completed);
    assert_eq!(visited, limit);
    Ok(())
}

#[rstest]
fn test_iter_keys_values_agree() -> Result<(), AmtError> {
    let map = PersistentMap::new().set_all((0_i32..50).map(|key| (key, -key)))?;

    let pairs: Vec<_> = map.iter().map(|(key, value)| (*key, *value)).collect();
    let keys: Vec<_> = map.keys().copied().collect();
    let values: Vec<_> = map.values().copied().collect();

    assert_eq!(pairs.len(), 50);
    assert_eq!(pairs.iter().map(|(key, _)| *key).collect::<Vec<_>>(), keys);
    assert_eq!(pairs.iter().map(|(_, value)| *value).collect::<Vec<_>>(), values);
    assert_eq!((&map).into_iter().count(), 50);
    Ok(())
}

// =============================================================================
// Size accounting
// =============================================================================

#[rstest]
fn test_size_grows_with_structure() -> Result<(), AmtError> {
    let empty = PersistentMap::with_hash_fn(leading_bytes);
    let one = empty.set("Hello".to_string(), "World!")?;
    let two = one.set("He11o".to_string(), "There!")?;

    assert!(empty.size() < one.size());
    assert!(one.size() < two.size());
    assert_eq!(two.depth(), 4);
    assert_eq!(two.delete(&"He11o".to_string())?.size(), one.size());
    Ok(())
}

// =============================================================================
// Formatting and equality
// =============================================================================

#[rstest]
fn test_display_single_entry() -> Result<(), AmtError> {
    let map = PersistentMap::new().set("Hello", "World!")?;
    assert_eq!(map.to_string(), "{Hello:World!}");
    assert_eq!(PersistentMap::<u8, u8>::new().to_string(), "{}");
    Ok(())
}

#[rstest]
fn test_debug_renders_as_map() -> Result<(), AmtError> {
    let map = PersistentMap::new().set(1_u8, "one")?;
    assert_eq!(format!("{map:?}"), r#"{1: "one"}"#);
    Ok(())
}

#[rstest]
fn test_equal_contents_built_differently() -> Result<(), AmtError> {
    let forward = PersistentMap::new().set_all((0_u32..64).map(|key| (key, key)))?;
    let backward = PersistentMap::new().set_all((0_u32..64).rev().map(|key| (key, key)))?;
    assert_eq!(forward, backward);
    Ok(())
}

// =============================================================================
// Unsupported keys
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct Opaque(u8);

#[rstest]
fn test_builtin_hasher_rejects_unknown_key() {
    let map: PersistentMap<Opaque, i32> = PersistentMap::new();

    assert!(matches!(map.set(Opaque(1), 1), Err(AmtError::UnsupportedKeyKind { .. })));
    assert!(map.get(&Opaque(1)).is_err());
    assert!(map.has(&Opaque(1)).is_err());
    assert!(map.delete(&Opaque(1)).is_err());
}

#[rstest]
fn test_set_all_stops_at_first_rejected_key() {
    let map: PersistentMap<Opaque, i32> = PersistentMap::new();
    assert!(map.set_all([(Opaque(1), 1), (Opaque(2), 2)]).is_err());
}

#[rstest]
fn test_hash_fn_accepts_custom_key() -> Result<(), AmtError> {
    let map = PersistentMap::with_hash_fn(|key: &Opaque| u32::from(key.0)).set(Opaque(9), "nine")?;
    assert_eq!(map.get(&Opaque(9))?, Some(&"nine"));
    Ok(())
}
