//! An open-addressing hash table with Robin-Hood probing, backward-shift
//! deletion, a pluggable load-factor strategy, and generation-counter
//! iterator-invalidation detection.
//!
//! ```
//! use robin_table::RobinTable;
//!
//! let mut t = RobinTable::new();
//! t.set("a", 1);
//! t.set("b", 2);
//! assert_eq!(t.get("a"), Some(&1));
//! assert_eq!(t.remove("a"), Ok(1));
//! assert_eq!(t.get("a"), None);
//! ```

mod error;
mod hash;
mod iter;
mod ops;
mod sizing;
mod slot;
mod table;

#[cfg(feature = "parallel")]
mod parallel;

#[cfg(feature = "serde")]
mod serde_impl;

pub use error::Error;
pub use iter::{IntoIter, Iter, Keys, Values, ValuesMut};
pub use sizing::SizingStrategy;
pub use table::RobinTable;
