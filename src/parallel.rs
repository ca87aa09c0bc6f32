//! Parallel bulk operations, gated behind the `parallel` feature.
//!
//! Rayon is used purely as a black-box parallel-fill-by-index primitive: the
//! table's entries are snapshotted into a `Vec`, the user-supplied closure is
//! applied across that `Vec` on rayon's pool, and the results are inserted
//! back into a freshly built table sequentially (insertion itself is not
//! parallelized, since Robin-Hood probing has no natural independent shards).
//! With the feature disabled, `par_map`/`par_filter` still exist as plain
//! sequential fallbacks so callers don't need `#[cfg]` of their own.
//!
//! Like `map`/`filter` in `ops.rs`, both operations only ever hold a `&self`
//! borrow, so neither can observe a structural mutation mid-scan: they
//! return the built table directly rather than wrapping it in `Result`.

use std::hash::{BuildHasher, Hash};

use crate::table::RobinTable;

#[cfg(feature = "parallel")]
impl<K, V, S> RobinTable<K, V, S>
where
    S: BuildHasher,
{
    /// Build a new table by applying `f` to every pair, computing the
    /// mapped values in parallel across rayon's global pool.
    pub fn par_map<V2, F>(&self, f: F) -> RobinTable<K, V2, S>
    where
        K: Hash + Eq + Clone + Send + Sync,
        V: Sync,
        V2: Send,
        S: Clone + Send,
        F: Fn(&K, &V) -> V2 + Sync + Send,
    {
        use rayon::prelude::*;

        let entries: Vec<(&K, &V)> = self.entries().collect();
        let mapped: Vec<(K, V2)> = entries
            .into_par_iter()
            .map(|(k, v)| (k.clone(), f(k, v)))
            .collect();

        let mut out = RobinTable::with_capacity_strategy_and_hasher(
            mapped.len(),
            self.strategy(),
            self.hasher().clone(),
        );
        for (k, v) in mapped {
            out.set(k, v);
        }
        out
    }

    /// Build a new table containing only the entries for which `predicate`
    /// returns `true`, evaluating the predicate in parallel. Short-circuits
    /// to a clone of `self` when every entry matches.
    pub fn par_filter<F>(&self, predicate: F) -> RobinTable<K, V, S>
    where
        K: Hash + Eq + Clone + Send + Sync,
        V: Clone + Send + Sync,
        S: Clone + Send,
        F: Fn(&K, &V) -> bool + Sync + Send,
    {
        use rayon::prelude::*;

        let entries: Vec<(&K, &V)> = self.entries().collect();
        let matches: Vec<bool> = entries
            .par_iter()
            .map(|(k, v)| predicate(k, v))
            .collect();
        let kept_count = matches.iter().filter(|&&m| m).count();
        if kept_count == entries.len() {
            return self.clone();
        }

        let mut out = RobinTable::with_capacity_strategy_and_hasher(
            kept_count,
            self.strategy(),
            self.hasher().clone(),
        );
        for ((k, v), kept) in entries.into_iter().zip(matches) {
            if kept {
                out.set(k.clone(), v.clone());
            }
        }
        out
    }
}

#[cfg(not(feature = "parallel"))]
impl<K, V, S> RobinTable<K, V, S>
where
    S: BuildHasher,
{
    /// Sequential fallback used when the `parallel` feature is disabled.
    pub fn par_map<V2, F>(&self, f: F) -> RobinTable<K, V2, S>
    where
        K: Hash + Eq + Clone,
        S: Clone,
        F: Fn(&K, &V) -> V2,
    {
        self.map(f)
    }

    /// Sequential fallback used when the `parallel` feature is disabled.
    /// Short-circuits to a clone of `self` when every entry matches, matching
    /// the parallel implementation's contract.
    pub fn par_filter<F>(&self, predicate: F) -> RobinTable<K, V, S>
    where
        K: Hash + Eq + Clone,
        V: Clone,
        S: Clone,
        F: Fn(&K, &V) -> bool,
    {
        let filtered = self.filter(predicate);
        if filtered.len() == self.len() {
            self.clone()
        } else {
            filtered
        }
    }
}

#[cfg(all(test, feature = "parallel"))]
mod tests {
    use super::*;

    #[test]
    fn par_map_matches_sequential_map() {
        let mut t = RobinTable::new();
        for i in 0..200i64 {
            t.set(i, i);
        }
        let expected = t.map(|_, v| v * 2);
        let actual = t.par_map(|_, v| v * 2);
        assert_eq!(expected.len(), actual.len());
        for i in 0..200i64 {
            assert_eq!(expected.get(&i), actual.get(&i));
        }
    }

    #[test]
    fn par_filter_matches_sequential_filter() {
        let mut t = RobinTable::new();
        for i in 0..200i64 {
            t.set(i, i);
        }
        let expected = t.filter(|k, _| k % 3 == 0);
        let actual = t.par_filter(|k, _| k % 3 == 0);
        assert_eq!(expected.len(), actual.len());
        for i in 0..200i64 {
            assert_eq!(expected.get(&i), actual.get(&i));
        }
    }

    #[test]
    fn par_filter_short_circuits_when_all_match() {
        let mut t = RobinTable::new();
        for i in 0..50i64 {
            t.set(i, i);
        }
        let all = t.par_filter(|_, _| true);
        assert_eq!(all.len(), t.len());
        assert_eq!(all, t);
    }
}
