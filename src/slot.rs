//! The physical storage unit of a [`RobinTable`](crate::RobinTable).

use std::mem::MaybeUninit;

use crate::hash::EMPTY_SENTINEL;

/// One slot in the table's backing array: a finalized hash paired with
/// possibly-uninitialized key/value storage.
///
/// A slot is empty iff `hash == EMPTY_SENTINEL`. When empty, `key` and
/// `value` are uninitialized and must never be read — callers are
/// responsible for checking [`Slot::is_empty`] first.
pub(crate) struct Slot<K, V> {
    pub(crate) hash: u64,
    key: MaybeUninit<K>,
    value: MaybeUninit<V>,
}

impl<K, V> Slot<K, V> {
    #[inline(always)]
    pub(crate) const fn empty() -> Self {
        Self {
            hash: EMPTY_SENTINEL,
            key: MaybeUninit::uninit(),
            value: MaybeUninit::uninit(),
        }
    }

    #[inline(always)]
    pub(crate) const fn is_empty(&self) -> bool {
        self.hash == EMPTY_SENTINEL
    }

    /// # Safety
    /// Caller must have verified `!self.is_empty()`.
    #[inline(always)]
    pub(crate) unsafe fn key_ref(&self) -> &K {
        self.key.assume_init_ref()
    }

    /// # Safety
    /// Caller must have verified `!self.is_empty()`.
    #[inline(always)]
    pub(crate) unsafe fn value_ref(&self) -> &V {
        self.value.assume_init_ref()
    }

    /// # Safety
    /// Caller must have verified `!self.is_empty()`.
    #[inline(always)]
    pub(crate) unsafe fn value_mut(&mut self) -> &mut V {
        self.value.assume_init_mut()
    }

    /// Overwrite this slot's value in place, without touching the stored key.
    ///
    /// # Safety
    /// Caller must have verified `!self.is_empty()`.
    #[inline(always)]
    pub(crate) unsafe fn replace_value(&mut self, value: V) -> V {
        std::mem::replace(self.value.assume_init_mut(), value)
    }

    /// Fill an empty (or about-to-be-overwritten-without-drop) slot.
    #[inline(always)]
    pub(crate) fn place(&mut self, hash: u64, key: K, value: V) {
        self.hash = hash;
        self.key = MaybeUninit::new(key);
        self.value = MaybeUninit::new(value);
    }

    /// Move `(hash, key, value)` out of this slot and mark it empty.
    ///
    /// # Safety
    /// Caller must have verified `!self.is_empty()`.
    #[inline(always)]
    pub(crate) unsafe fn take(&mut self) -> (u64, K, V) {
        let hash = self.hash;
        self.hash = EMPTY_SENTINEL;
        let key = std::mem::replace(&mut self.key, MaybeUninit::uninit()).assume_init();
        let value = std::mem::replace(&mut self.value, MaybeUninit::uninit()).assume_init();
        (hash, key, value)
    }

    /// Drop the occupied key/value in place without moving them, and mark
    /// the slot empty.
    ///
    /// # Safety
    /// Caller must have verified `!self.is_empty()`.
    #[inline]
    pub(crate) unsafe fn drop_in_place(&mut self) {
        self.hash = EMPTY_SENTINEL;
        self.key.assume_init_drop();
        self.value.assume_init_drop();
    }
}
