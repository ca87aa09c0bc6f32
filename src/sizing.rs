//! Pluggable load-factor policies.
//!
//! A [`SizingStrategy`] maps between *raw capacity* (the physical slot count,
//! always a power of two) and *real capacity* (the maximum number of live
//! entries allowed before the table must grow). Dispatch is a plain enum
//! match rather than a trait object so the hot insert/grow paths devirtualize
//! and inline cleanly.

/// The smallest raw (physical) capacity a non-empty table is ever allocated with.
pub const MIN_RAW_CAPACITY: usize = 8;

/// Load-factor policy used by a [`RobinTable`](crate::RobinTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizingStrategy {
    /// 90.9% load factor (`real = ceil(raw * 10 / 11)`). The default: fewest wasted slots.
    #[default]
    Aggressive,
    /// 80% load factor (`real = raw * 4 / 5`).
    Moderate,
    /// 50% load factor (`real = raw / 2`). Shortest probe sequences.
    Conservative,
}

impl SizingStrategy {
    /// Human-readable name, mostly useful for `Debug`/diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aggressive => "aggressive",
            Self::Moderate => "moderate",
            Self::Conservative => "conservative",
        }
    }

    /// Maximum number of live entries a table with `raw` physical slots may hold.
    #[inline(always)]
    pub const fn real_of_raw(self, raw: usize) -> usize {
        match self {
            Self::Aggressive => (raw * 10 + 9) / 11,
            Self::Moderate => raw * 4 / 5,
            Self::Conservative => raw / 2,
        }
    }

    /// Smallest power-of-two raw capacity whose real capacity is `>= real`.
    ///
    /// `raw_of_real(0) == 1`: the zero-size table uses a single sentinel slot so
    /// that lookup/insert never has to special-case an empty allocation. The
    /// first real insertion grows the table to [`MIN_RAW_CAPACITY`].
    #[inline]
    pub const fn raw_of_real(self, real: usize) -> usize {
        if real == 0 {
            return 1;
        }
        let mut raw = MIN_RAW_CAPACITY;
        while self.real_of_raw(raw) < real {
            raw *= 2;
        }
        raw
    }
}
