//! Search, transform and trait-impl surface built on top of the core table:
//! `find`/`find_entry`, `map`/`filter`, and the standard trait impls.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};

use crate::table::RobinTable;

impl<K, V, S> RobinTable<K, V, S>
where
    S: BuildHasher,
{
    /// Return the value of the first pair for which `predicate` returns
    /// `true`, or `None` if none match. Iteration order is unspecified.
    ///
    /// Unlike [`RobinTable::each`], `find` takes no generation guard: it
    /// only ever holds a `&self` borrow, so no mutation (structural or
    /// otherwise) can happen while it runs.
    pub fn find(&self, predicate: impl FnMut(&K, &V) -> bool) -> Option<&V> {
        self.find_entry(predicate).map(|(_, v)| v)
    }

    /// Like [`RobinTable::find`] but returns the full `(&K, &V)` pair.
    pub fn find_entry(&self, mut predicate: impl FnMut(&K, &V) -> bool) -> Option<(&K, &V)> {
        for i in 0..self.raw_capacity() {
            let slot = &self.slots[i];
            if slot.is_empty() {
                continue;
            }
            let (k, v) = unsafe { (slot.key_ref(), slot.value_ref()) };
            if predicate(k, v) {
                return Some((k, v));
            }
        }
        None
    }

    /// Build a new table by applying `f` to every `(&K, &V)` pair. The key is
    /// preserved; only the value is transformed.
    ///
    /// Infallible: like `find`/`find_entry`, this only ever holds a `&self`
    /// borrow, so no structural mutation (and hence no generation skip) can
    /// happen while it scans.
    pub fn map<V2>(&self, mut f: impl FnMut(&K, &V) -> V2) -> RobinTable<K, V2, S>
    where
        K: Hash + Eq + Clone,
        S: Clone,
    {
        let mut out = RobinTable::with_capacity_strategy_and_hasher(
            self.len(),
            self.strategy(),
            self.hasher().clone(),
        );
        for (k, v) in self.entries() {
            out.set(k.clone(), f(k, v));
        }
        out
    }

    /// Build a new table by applying `f` to every `(K, V)` pair, rewriting
    /// both the key and the value. Total: every source entry produces a
    /// destination entry. If `f` maps two different source keys to the same
    /// new key, the later one (in physical slot order) wins, the same as
    /// inserting both via `set`. To drop entries instead of rewriting them,
    /// use [`RobinTable::filter`].
    pub fn map_items<K2, V2>(
        &self,
        mut f: impl FnMut(&K, &V) -> (K2, V2),
    ) -> RobinTable<K2, V2, ahash::RandomState>
    where
        K2: Hash + Eq,
    {
        let mut out = RobinTable::with_capacity(self.len());
        for (k, v) in self.entries() {
            let (k2, v2) = f(k, v);
            out.set(k2, v2);
        }
        out
    }

    /// Build a new table containing only the entries for which `predicate`
    /// returns `true`.
    pub fn filter(&self, mut predicate: impl FnMut(&K, &V) -> bool) -> RobinTable<K, V, S>
    where
        K: Hash + Eq + Clone,
        V: Clone,
        S: Clone,
    {
        let mut out = RobinTable::with_capacity_strategy_and_hasher(
            0,
            self.strategy(),
            self.hasher().clone(),
        );
        for (k, v) in self.entries() {
            if predicate(k, v) {
                out.set(k.clone(), v.clone());
            }
        }
        out
    }

    /// Iterate over every occupied slot directly, bypassing the
    /// generation-guarded [`RobinTable::iter`]. Used by the bulk operations
    /// in this crate that only ever hold a `&self` borrow and so can never
    /// observe a structural mutation mid-scan.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        (0..self.raw_capacity()).filter_map(move |i| {
            let slot = &self.slots[i];
            if slot.is_empty() {
                None
            } else {
                Some(unsafe { (slot.key_ref(), slot.value_ref()) })
            }
        })
    }
}

impl<K, U, S> RobinTable<K, Option<U>, S>
where
    K: Hash + Eq + Clone,
    U: Clone,
    S: BuildHasher + Clone,
{
    /// Build a new table holding only the entries whose value is `Some`,
    /// with each value unwrapped. Keys whose value is `None` are dropped.
    pub fn filter_none(&self) -> RobinTable<K, U, S> {
        let mut out = RobinTable::with_capacity_strategy_and_hasher(
            0,
            self.strategy(),
            self.hasher().clone(),
        );
        for (k, v) in self.entries() {
            if let Some(v) = v {
                out.set(k.clone(), v.clone());
            }
        }
        out
    }
}

impl<K, V, S> RobinTable<K, V, S> {
    /// The table's hash-builder, mostly useful for constructing a sibling
    /// table that must hash identically.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }
}

impl<K, V, S> fmt::Debug for RobinTable<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_map();
        for i in 0..self.raw_capacity() {
            let slot = &self.slots[i];
            if !slot.is_empty() {
                let (k, v) = unsafe { (slot.key_ref(), slot.value_ref()) };
                dbg.entry(k, v);
            }
        }
        dbg.finish()
    }
}

impl<K, V, S> fmt::Display for RobinTable<K, V, S>
where
    K: fmt::Display,
    V: fmt::Display,
{
    /// Renders as `{k1: v1, k2: v2, ...}` in physical slot order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut first = true;
        for i in 0..self.raw_capacity() {
            let slot = &self.slots[i];
            if slot.is_empty() {
                continue;
            }
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            let (k, v) = unsafe { (slot.key_ref(), slot.value_ref()) };
            write!(f, "{k}: {v}")?;
        }
        f.write_str("}")
    }
}

impl<K, V, S> PartialEq for RobinTable<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    /// Two tables are equal iff they contain the same key/value pairs.
    /// Asymmetric in cost but symmetric in result: comparing `a == b` walks
    /// `a` and looks each key up in `b`.
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|item| match item {
            Ok((k, v)) => other.get(k) == Some(v),
            Err(_) => false,
        })
    }
}

impl<K, V, S> Eq for RobinTable<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Hash for RobinTable<K, V, S>
where
    K: Hash + Eq,
    V: Hash,
    S: BuildHasher,
{
    /// Order-independent: XORs a per-entry hash together so that
    /// `a == b ⇒ hash(a) == hash(b)` holds regardless of insertion order.
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut acc: u64 = 0;
        for i in 0..self.raw_capacity() {
            let slot = &self.slots[i];
            if slot.is_empty() {
                continue;
            }
            let mut entry_hasher = DefaultHasher::new();
            unsafe { slot.key_ref() }.hash(&mut entry_hasher);
            unsafe { slot.value_ref() }.hash(&mut entry_hasher);
            acc ^= entry_hasher.finish();
        }
        acc.hash(state);
    }
}

impl<K, V, S> FromIterator<(K, V)> for RobinTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let it = iter.into_iter();
        let (lower, _) = it.size_hint();
        let mut table = RobinTable::with_capacity_and_hasher(lower, S::default());
        for (k, v) in it {
            table.set(k, v);
        }
        table
    }
}

impl<K, V, S> Extend<(K, V)> for RobinTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let it = iter.into_iter();
        let (lower, _) = it.size_hint();
        let _ = self.reserve(lower);
        for (k, v) in it {
            self.set(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_insertion_order() {
        let a: RobinTable<i32, i32> = [(1, 1), (2, 2), (3, 3)].into_iter().collect();
        let b: RobinTable<i32, i32> = [(3, 3), (1, 1), (2, 2)].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn hash_matches_when_equal() {
        use std::collections::hash_map::DefaultHasher;

        let a: RobinTable<i32, i32> = [(1, 1), (2, 2), (3, 3)].into_iter().collect();
        let b: RobinTable<i32, i32> = [(3, 3), (1, 1), (2, 2)].into_iter().collect();
        assert_eq!(a, b);

        let mut ha = DefaultHasher::new();
        a.hash(&mut ha);
        let mut hb = DefaultHasher::new();
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn map_preserves_keys_and_transforms_values() {
        let mut t = RobinTable::new();
        t.set(1, 10);
        t.set(2, 20);
        let doubled = t.map(|_, v| v * 2);
        assert_eq!(doubled.get(&1), Some(&20));
        assert_eq!(doubled.get(&2), Some(&40));
    }

    #[test]
    fn map_items_rewrites_keys_and_values_totally() {
        let mut t = RobinTable::new();
        t.set(1, "a");
        t.set(2, "b");
        let renamed = t.map_items(|k, v| (k.to_string(), v.to_uppercase()));
        assert_eq!(renamed.len(), 2);
        assert_eq!(renamed.get("1"), Some(&"A".to_string()));
        assert_eq!(renamed.get("2"), Some(&"B".to_string()));
    }

    #[test]
    fn map_items_merges_on_key_collision() {
        let mut t = RobinTable::new();
        t.set(1, "a");
        t.set(2, "b");
        t.set(3, "c");
        // every source key collapses onto the same destination key
        let collapsed = t.map_items(|_, v| ("same".to_string(), v.to_string()));
        assert_eq!(collapsed.len(), 1);
        assert!(collapsed.contains_key("same"));
    }

    #[test]
    fn filter_keeps_only_matching_entries() {
        let mut t = RobinTable::new();
        for i in 0..20 {
            t.set(i, i);
        }
        let evens = t.filter(|k, _| k % 2 == 0);
        assert_eq!(evens.len(), 10);
        assert!(evens.get(&1).is_none());
        assert_eq!(evens.get(&4), Some(&4));
    }

    #[test]
    fn filter_none_drops_none_and_unwraps_some() {
        let mut t = RobinTable::new();
        t.set(1, Some("a"));
        t.set(2, None);
        t.set(3, Some("c"));
        let compacted = t.filter_none();
        assert_eq!(compacted.len(), 2);
        assert_eq!(compacted.get(&1), Some(&"a"));
        assert_eq!(compacted.get(&2), None);
        assert_eq!(compacted.get(&3), Some(&"c"));
    }

    #[test]
    fn find_returns_first_match() {
        let mut t = RobinTable::new();
        t.set(1, "a");
        t.set(2, "b");
        assert_eq!(t.find(|_, v| *v == "b"), Some(&"b"));
        assert_eq!(t.find(|_, v| *v == "z"), None);
        assert_eq!(t.find_entry(|_, v| *v == "b"), Some((&2, &"b")));
    }

    #[test]
    fn debug_format_contains_entries() {
        let mut t = RobinTable::new();
        t.set(1, "a");
        let rendered = format!("{t:?}");
        assert!(rendered.contains('1'));
        assert!(rendered.contains('a'));
    }

    #[test]
    fn display_format_renders_braced_pairs() {
        let mut t = RobinTable::new();
        t.set(1, "a");
        let rendered = t.to_string();
        assert!(rendered.starts_with('{'));
        assert!(rendered.ends_with('}'));
        assert!(rendered.contains("1: a"));
    }

    #[test]
    fn display_empty_table_is_empty_braces() {
        let t: RobinTable<i32, i32> = RobinTable::new();
        assert_eq!(t.to_string(), "{}");
    }
}
