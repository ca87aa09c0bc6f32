//! The core [`RobinTable`] type: storage, insertion, lookup, deletion and growth.

use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};

use crate::error::Error;
use crate::hash::finalize;
use crate::sizing::SizingStrategy;
use crate::slot::Slot;

/// One iterator "generation skip": added to the table's generation counter on
/// every structural mutation. Large enough that an iterator's cursor, which
/// tracks `index - generation`, rockets past the end of the slot array on its
/// next read after a single skip, turning invalidation detection into a
/// cold-path bounds check instead of a branch on every step.
pub(crate) const GENERATION_SKIP: u64 = 1 << 32;

/// An open-addressing hash table with Robin-Hood probing and backward-shift
/// deletion.
///
/// `RobinTable` stores `(K, V)` pairs with no ordering guarantee beyond
/// "stable between structural mutations". It detects re-entrant structural
/// mutation during iteration (see [`RobinTable::each`]) via a generation
/// counter rather than preventing it outright.
pub struct RobinTable<K, V, S = ahash::RandomState> {
    pub(crate) slots: Box<[Slot<K, V>]>,
    pub(crate) mask: usize,
    pub(crate) size: usize,
    pub(crate) generation: u64,
    strategy: SizingStrategy,
    pub(crate) hash_builder: S,
}

#[inline(always)]
pub(crate) fn probe_distance(i: usize, hash: u64, mask: usize) -> usize {
    i.wrapping_sub((hash as usize) & mask) & mask
}

fn alloc_slots<K, V>(raw: usize) -> Box<[Slot<K, V>]> {
    debug_assert!(raw >= 1);
    std::iter::repeat_with(Slot::empty).take(raw).collect()
}

enum InsertOutcome<V> {
    Inserted,
    Replaced(V),
    Rejected,
}

impl<K, V> RobinTable<K, V, ahash::RandomState> {
    /// Create an empty table using the default (Aggressive, 90.9%) sizing strategy.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty table pre-sized to hold at least `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_strategy(capacity, SizingStrategy::default())
    }

    /// Create an empty table pre-sized to hold at least `capacity` entries,
    /// using the given [`SizingStrategy`].
    pub fn with_capacity_and_strategy(capacity: usize, strategy: SizingStrategy) -> Self {
        Self::with_capacity_strategy_and_hasher(capacity, strategy, ahash::RandomState::default())
    }
}

impl<K, V> Default for RobinTable<K, V, ahash::RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> RobinTable<K, V, S> {
    /// Create an empty table using a caller-supplied [`BuildHasher`].
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_strategy_and_hasher(0, SizingStrategy::default(), hash_builder)
    }

    /// Create an empty table pre-sized to hold at least `capacity` entries,
    /// using a caller-supplied [`BuildHasher`].
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::with_capacity_strategy_and_hasher(capacity, SizingStrategy::default(), hash_builder)
    }

    /// Create an empty table with an explicit strategy and hasher.
    pub fn with_capacity_strategy_and_hasher(
        capacity: usize,
        strategy: SizingStrategy,
        hash_builder: S,
    ) -> Self {
        let raw = strategy.raw_of_real(capacity);
        Self {
            slots: alloc_slots(raw),
            mask: raw - 1,
            size: 0,
            generation: 0,
            strategy,
            hash_builder,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.size
    }

    /// `true` iff the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Maximum number of entries that can be held before the next growth.
    pub fn capacity(&self) -> usize {
        self.strategy.real_of_raw(self.slots.len())
    }

    /// Physical slot-array length (always a power of two).
    pub fn raw_capacity(&self) -> usize {
        self.slots.len()
    }

    /// The sizing strategy this table was created with.
    pub fn strategy(&self) -> SizingStrategy {
        self.strategy
    }

    /// Remove every entry, dropping all stored keys and values. Invalidates
    /// live iterators.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            if !slot.is_empty() {
                unsafe { slot.drop_in_place() };
            }
        }
        self.size = 0;
        self.bump_generation();
    }

    #[inline(always)]
    pub(crate) fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(GENERATION_SKIP);
    }

    #[inline(always)]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Walk every occupied slot and confirm the Robin-Hood ordering invariant
    /// (I5): scanning forward from any entry's ideal slot never crosses an
    /// empty slot, and probe distances never decrease along a run. Exposed
    /// for tests and debugging; an honestly-implemented table always passes.
    pub fn is_robin_hood_ordered(&self) -> bool {
        let raw = self.slots.len();
        if raw <= 1 {
            return true;
        }
        for start in 0..raw {
            if self.slots[start].is_empty() {
                continue;
            }
            // only check runs that begin a fresh ideal-slot group, i.e. the
            // slot before `start` is empty or `start` is itself an ideal slot
            let prev = (start + raw - 1) % raw;
            if !self.slots[prev].is_empty() {
                continue;
            }
            let mut last_dist: Option<usize> = None;
            let mut i = start;
            loop {
                if self.slots[i].is_empty() {
                    break;
                }
                let dist = probe_distance(i, self.slots[i].hash, self.mask);
                if let Some(last) = last_dist {
                    if dist < last {
                        return false;
                    }
                }
                last_dist = Some(dist);
                i = (i + 1) % raw;
                if i == start {
                    break;
                }
            }
        }
        true
    }
}

impl<K, V, S> RobinTable<K, V, S>
where
    S: BuildHasher,
{
    #[inline(always)]
    fn hash_of<Q>(&self, key: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        finalize(self.hash_builder.hash_one(key))
    }

    fn find_slot_index<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.size == 0 {
            return None;
        }
        let hash = self.hash_of(key);
        let mut i = hash as usize & self.mask;
        let mut dist = 0usize;
        loop {
            let slot = &self.slots[i];
            if slot.is_empty() {
                return None;
            }
            if slot.hash == hash && unsafe { slot.key_ref() }.borrow() == key {
                return Some(i);
            }
            let entry_dist = probe_distance(i, slot.hash, self.mask);
            if entry_dist < dist {
                return None;
            }
            i = (i + 1) & self.mask;
            dist += 1;
        }
    }

    /// Look up a value by key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_slot_index(key)
            .map(|i| unsafe { self.slots[i].value_ref() })
    }

    /// Look up a mutable reference to a value by key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_slot_index(key)
            .map(move |i| unsafe { self.slots[i].value_mut() })
    }

    /// Look up the stored `(&K, &V)` pair by key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_slot_index(key).map(|i| {
            let slot = &self.slots[i];
            (unsafe { slot.key_ref() }, unsafe { slot.value_ref() })
        })
    }

    /// `true` iff `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_slot_index(key).is_some()
    }

    /// Called after a genuine new-key insertion raised `size` to its new
    /// value; grows if that pushed the table to or past its load-factor
    /// threshold. Using `>=` rather than pre-checking before the insert means
    /// the one-slot sentinel allocation (`capacity() == 1` at `raw == 1`)
    /// naturally grows to `MIN_RAW_CAPACITY` on its first real entry, with no
    /// separate special case.
    fn grow_if_at_capacity(&mut self) {
        if self.size >= self.capacity() {
            self.grow();
        }
    }

    fn grow(&mut self) {
        let old_raw = self.slots.len();
        let new_raw = if old_raw <= 1 {
            crate::sizing::MIN_RAW_CAPACITY
        } else {
            old_raw * 2
        };
        self.resize_to(new_raw);
    }

    /// Ensure the table can hold `additional` more entries without growing again.
    pub fn reserve(&mut self, additional: usize) -> Result<(), Error> {
        let needed = self
            .size
            .checked_add(additional)
            .ok_or(Error::InvalidArgument)?;
        let new_raw = self.strategy.raw_of_real(needed);
        if new_raw > self.slots.len() {
            self.resize_to(new_raw);
        }
        Ok(())
    }

    fn resize_to(&mut self, new_raw: usize) {
        let old_raw = self.slots.len();
        let old_mask = old_raw - 1;
        let old_size = self.size;
        let mut old_slots = std::mem::replace(&mut self.slots, alloc_slots(new_raw));
        self.mask = new_raw - 1;
        self.size = 0;

        if old_size > 0 {
            let anchor = (0..old_raw)
                .find(|&i| old_slots[i].is_empty())
                .map(|empty_idx| (empty_idx + 1) & old_mask)
                .unwrap_or(0);
            for offset in 0..old_raw {
                let i = (anchor + offset) & old_mask;
                if old_slots[i].is_empty() {
                    continue;
                }
                let (hash, key, value) = unsafe { old_slots[i].take() };
                self.insert_during_grow(hash, key, value);
            }
        }
        debug_assert_eq!(self.size, old_size, "grow must preserve size");
        self.bump_generation();
    }

    /// Reinsertion during growth: the source was already Robin-Hood ordered
    /// and is replayed in priority order, so plain linear placement (no
    /// rich/poor comparison) reproduces a valid ordering in the destination.
    fn insert_during_grow(&mut self, hash: u64, key: K, value: V) {
        let mut i = hash as usize & self.mask;
        loop {
            if self.slots[i].is_empty() {
                self.slots[i].place(hash, key, value);
                self.size += 1;
                return;
            }
            i = (i + 1) & self.mask;
        }
    }

    fn robin_hood_insert(
        &mut self,
        mut hash: u64,
        mut key: K,
        mut value: V,
        replace_existing: bool,
    ) -> (InsertOutcome<V>, usize)
    where
        K: Eq,
    {
        let mut i = hash as usize & self.mask;
        let mut dist = 0usize;
        let mut target_index: Option<usize> = None;
        loop {
            if self.slots[i].is_empty() {
                self.slots[i].place(hash, key, value);
                self.size += 1;
                return (InsertOutcome::Inserted, target_index.unwrap_or(i));
            }
            if self.slots[i].hash == hash && unsafe { self.slots[i].key_ref() } == &key {
                if replace_existing {
                    let old = unsafe { self.slots[i].replace_value(value) };
                    return (InsertOutcome::Replaced(old), i);
                }
                return (InsertOutcome::Rejected, i);
            }
            let entry_dist = probe_distance(i, self.slots[i].hash, self.mask);
            if entry_dist < dist {
                let displaced_hash = self.slots[i].hash;
                let (_, displaced_key, displaced_value) = unsafe { self.slots[i].take() };
                self.slots[i].place(hash, key, value);
                if target_index.is_none() {
                    target_index = Some(i);
                }
                hash = displaced_hash;
                key = displaced_key;
                value = displaced_value;
                dist = entry_dist;
            }
            i = (i + 1) & self.mask;
            dist += 1;
        }
    }

    /// Insert `value` for `key`. If `key` was already present, its value is
    /// replaced and the previous value is returned; the stored key and any
    /// live iterator are left untouched. Otherwise a new entry is inserted
    /// and live iterators are invalidated.
    pub fn set(&mut self, key: K, value: V) -> Option<V>
    where
        K: Hash + Eq,
    {
        let hash = self.hash_of(&key);
        match self.robin_hood_insert(hash, key, value, true) {
            (InsertOutcome::Replaced(old), _) => Some(old),
            (InsertOutcome::Inserted, _) => {
                self.bump_generation();
                self.grow_if_at_capacity();
                None
            }
            (InsertOutcome::Rejected, _) => unreachable!("replace_existing=true never rejects"),
        }
    }

    /// Insert `value` for `key`, failing with [`Error::Duplicate`] if `key`
    /// is already present (the table is left untouched in that case).
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(), Error>
    where
        K: Hash + Eq,
    {
        let hash = self.hash_of(&key);
        match self.robin_hood_insert(hash, key, value, false) {
            (InsertOutcome::Inserted, _) => {
                self.bump_generation();
                self.grow_if_at_capacity();
                Ok(())
            }
            (InsertOutcome::Rejected, _) => Err(Error::Duplicate),
            (InsertOutcome::Replaced(_), _) => unreachable!("replace_existing=false never replaces"),
        }
    }

    /// Insert `value` for `key` only if absent. Returns `true` if inserted.
    pub fn insert_if_absent(&mut self, key: K, value: V) -> bool
    where
        K: Hash + Eq,
    {
        self.try_insert(key, value).is_ok()
    }

    /// Return a mutable reference to the value for `key`, inserting
    /// `factory()` first if it is absent.
    pub fn get_or_insert_with(&mut self, key: K, factory: impl FnOnce() -> V) -> &mut V
    where
        K: Hash + Eq + Clone,
    {
        if self.find_slot_index(&key).is_none() {
            let value = factory();
            let hash = self.hash_of(&key);
            let key_for_lookup = key.clone();
            let (outcome, _) = self.robin_hood_insert(hash, key, value, true);
            debug_assert!(matches!(outcome, InsertOutcome::Inserted));
            self.bump_generation();
            // A possible grow reallocates the slot array, so the index the
            // insert returned may already be stale; re-locate by key instead.
            self.grow_if_at_capacity();
            let idx = self
                .find_slot_index(&key_for_lookup)
                .expect("just inserted");
            return unsafe { self.slots[idx].value_mut() };
        }
        let idx = self.find_slot_index(&key).expect("checked present above");
        unsafe { self.slots[idx].value_mut() }
    }

    fn remove_at(&mut self, i: usize) -> (K, V) {
        let (_, key, value) = unsafe { self.slots[i].take() };
        self.size -= 1;
        self.bump_generation();

        let mut hole = i;
        loop {
            let next = (hole + 1) & self.mask;
            if self.slots[next].is_empty() {
                break;
            }
            let next_ideal = self.slots[next].hash as usize & self.mask;
            if next_ideal == next {
                break;
            }
            let moved_hash = self.slots[next].hash;
            let (_, moved_key, moved_value) = unsafe { self.slots[next].take() };
            self.slots[hole].place(moved_hash, moved_key, moved_value);
            hole = next;
        }
        (key, value)
    }

    /// Remove `key`, returning its value, or [`Error::KeyNotFound`] if absent.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V, Error>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_slot_index(key)
            .map(|i| self.remove_at(i).1)
            .ok_or(Error::KeyNotFound)
    }

    /// Remove `key`, returning the `(K, V)` pair, or [`Error::KeyNotFound`]
    /// if absent.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Result<(K, V), Error>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_slot_index(key)
            .map(|i| self.remove_at(i))
            .ok_or(Error::KeyNotFound)
    }

    /// Like [`RobinTable::remove`] but returns `Option<V>` instead of a `Result`.
    pub fn maybe_remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove(key).ok()
    }
}

impl<K, V, S> Drop for RobinTable<K, V, S> {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            if !slot.is_empty() {
                unsafe { slot.drop_in_place() };
            }
        }
    }
}

impl<K: Clone, V: Clone, S: Clone> Clone for RobinTable<K, V, S> {
    fn clone(&self) -> Self {
        let mut new_slots = alloc_slots(self.slots.len());
        for (i, slot) in self.slots.iter().enumerate() {
            if !slot.is_empty() {
                let key = unsafe { slot.key_ref() }.clone();
                let value = unsafe { slot.value_ref() }.clone();
                new_slots[i].place(slot.hash, key, value);
            }
        }
        Self {
            slots: new_slots,
            mask: self.mask,
            size: self.size,
            generation: 0,
            strategy: self.strategy,
            hash_builder: self.hash_builder.clone(),
        }
    }
}

impl<K, V, S> RobinTable<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    /// Clone this table, reserving room for `additional` more entries beyond
    /// what it currently holds.
    pub fn clone_reserving(&self, additional: usize) -> Self
    where
        S: BuildHasher,
    {
        let mut cloned = self.clone();
        let _ = cloned.reserve(additional);
        cloned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_has_one_slot() {
        let t: RobinTable<i32, i32> = RobinTable::new();
        assert_eq!(t.raw_capacity(), 1);
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn insert_then_get() {
        let mut t = RobinTable::new();
        assert_eq!(t.set(1, "a"), None);
        assert_eq!(t.set(2, "b"), None);
        assert_eq!(t.get(&1), Some(&"a"));
        assert_eq!(t.get(&2), Some(&"b"));
        assert_eq!(t.get(&3), None);
    }

    #[test]
    fn set_replaces_value_without_growing() {
        let mut t = RobinTable::new();
        t.set(1, "a");
        let raw_before = t.raw_capacity();
        assert_eq!(t.set(1, "z"), Some("a"));
        assert_eq!(t.get(&1), Some(&"z"));
        assert_eq!(t.raw_capacity(), raw_before);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn try_insert_rejects_duplicates() {
        let mut t = RobinTable::new();
        t.try_insert(1, "a").unwrap();
        assert_eq!(t.try_insert(1, "b"), Err(Error::Duplicate));
        assert_eq!(t.get(&1), Some(&"a"));
    }

    #[test]
    fn remove_then_lookup_fails() {
        let mut t = RobinTable::new();
        t.set(1, "a");
        t.set(2, "b");
        t.set(3, "c");
        assert_eq!(t.remove(&2), Ok("b"));
        assert_eq!(t.get(&2), None);
        assert_eq!(t.len(), 2);
        assert_eq!(t.remove(&2), Err(Error::KeyNotFound));
    }

    #[test]
    fn scenario_s1() {
        let mut t = RobinTable::new();
        t.set(1, "a");
        t.set(2, "b");
        t.set(3, "c");
        assert_eq!(t.get(&2), Some(&"b"));
        t.remove(&2).unwrap();
        assert_eq!(t.get(&2), None);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn insertion_and_removal_preserve_robin_hood_order() {
        let mut t = RobinTable::new();
        for i in 0..500i64 {
            t.set(i, i * 2);
            assert!(t.is_robin_hood_ordered(), "violated after inserting {i}");
        }
        for i in (0..500i64).step_by(3) {
            t.remove(&i).unwrap();
            assert!(t.is_robin_hood_ordered(), "violated after removing {i}");
        }
    }

    #[test]
    fn growth_preserves_all_entries() {
        let mut t = RobinTable::new();
        for i in 0..2000i64 {
            t.set(i, i.to_string());
        }
        assert_eq!(t.len(), 2000);
        for i in 0..2000i64 {
            assert_eq!(t.get(&i), Some(&i.to_string()));
        }
    }

    #[test]
    fn get_or_insert_with_only_calls_factory_once() {
        let mut t = RobinTable::new();
        let mut calls = 0;
        *t.get_or_insert_with("k", || {
            calls += 1;
            10
        }) += 1;
        t.get_or_insert_with("k", || {
            calls += 1;
            999
        });
        assert_eq!(calls, 1);
        assert_eq!(t.get(&"k"), Some(&11));
    }

    #[test]
    fn reserve_grows_capacity_only_when_needed() {
        let mut t: RobinTable<i32, i32> = RobinTable::with_capacity(4);
        let raw = t.raw_capacity();
        t.reserve(1).unwrap();
        assert_eq!(t.raw_capacity(), raw);
        t.reserve(1000).unwrap();
        assert!(t.raw_capacity() > raw);
    }

    #[test]
    fn clear_empties_table_and_bumps_generation() {
        let mut t = RobinTable::new();
        t.set(1, "a");
        let gen_before = t.generation();
        t.clear();
        assert_eq!(t.len(), 0);
        assert_eq!(t.get(&1), None);
        assert_ne!(t.generation(), gen_before);
    }

    // Scenario S2: all keys hash identically, forcing every key into the
    // same ideal slot and exercising the full probe sequence on every op.
    struct ConstantHasher;
    impl std::hash::Hasher for ConstantHasher {
        fn finish(&self) -> u64 {
            0
        }
        fn write(&mut self, _bytes: &[u8]) {}
    }
    #[derive(Clone, Default)]
    struct ConstantBuildHasher;
    impl BuildHasher for ConstantBuildHasher {
        type Hasher = ConstantHasher;
        fn build_hasher(&self) -> ConstantHasher {
            ConstantHasher
        }
    }

    #[test]
    fn scenario_s2_colliding_hashes() {
        let mut t: RobinTable<i32, i32> =
            RobinTable::with_capacity_and_hasher(0, ConstantBuildHasher);
        for i in 0..100 {
            t.set(i, i);
        }
        assert_eq!(t.len(), 100);
        for i in 0..100 {
            assert_eq!(t.get(&i), Some(&i));
        }
        t.remove(&50).unwrap();
        for i in 0..100 {
            if i == 50 {
                assert_eq!(t.get(&i), None);
            } else {
                assert_eq!(t.get(&i), Some(&i));
            }
        }
    }
}
