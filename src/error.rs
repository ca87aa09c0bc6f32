use thiserror::Error;

/// Errors produced by [`RobinTable`](crate::RobinTable) operations.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// `remove`/`remove_entry` was called with a key that isn't present.
    #[error("key not found")]
    KeyNotFound,
    /// `try_insert` was called with a key that already exists.
    #[error("key already exists")]
    Duplicate,
    /// An iteration observed a structural mutation that happened after it started.
    #[error("container was structurally modified during iteration")]
    ContainerChanged,
    /// A capacity argument could not be honored (overflow, or not representable
    /// as a power-of-two raw capacity).
    #[error("invalid capacity argument")]
    InvalidArgument,
}
