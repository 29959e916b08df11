// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Hash map, set, and related hashing utilities.
//!
//! Weft uses [`rapidhash::RapidHashMap`] and [`rapidhash::RapidHashSet`] as stand-ins for
//! `std::collections::HashMap` and `std::collections::HashSet` (they ARE `std::collections::HashMap` and
//! `std::collections::HashSet`, but using the [`rapidhash::fast::RandomState`] hash builder.)
//!
//! The chart's deduplication table and secondary indexes hash a lot of small id
//! tuples on larger inputs; rapidhash is *very fast* on those and sufficiently
//! secure for our needs. It's not a cryptographic hash, but we seed the hash
//! builder randomly, so it should be resistant to hash collision attacks.

use rapidhash::RapidBuildHasher as RandomState;

// These are effectively aliases for `rapidhash::RapidHashMap` and `rapidhash::RapidHashSet`
// They're less of a mouthful, and we avoid type aliasing a type alias
/// A type alias for `[rapidhash::RapidHashMap]`.
pub type RapidMap<K, V> = rapidhash::RapidHashMap<K, V>;
/// A type alias for `[rapidhash::RapidHashSet]`.
pub type RapidSet<T> = rapidhash::RapidHashSet<T>;

/// Creates a new `RapidMap` with the specified capacity; returning the initialized map for use.
#[inline(always)]
#[must_use] pub fn map_with_capacity<K, V>(capacity: usize) -> RapidMap<K, V>
where
    K: std::hash::Hash + Eq,
{
    RapidMap::with_capacity_and_hasher(capacity, RandomState::default())
}

/// Creates a new `RapidSet` with the specified capacity; returning the initialized set for use.
#[inline(always)]
#[must_use] pub fn set_with_capacity<T>(capacity: usize) -> RapidSet<T>
where
    T: std::hash::Hash + Eq,
{
    RapidSet::with_capacity_and_hasher(capacity, RandomState::default())
}

/// Returns a new `RapidMap` with default values.
#[inline(always)]
#[must_use] pub fn get_map<K, V>() -> RapidMap<K, V> {
    RapidMap::default()
}

/// Returns a new `RapidSet` with default values (a [`rapidhash::RapidHashSet`]).
#[inline(always)]
#[must_use] pub fn get_set<T>() -> RapidSet<T> {
    RapidSet::default()
}
