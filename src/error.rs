//! Error types for allocation and configuration.
//!
//! The conventional entry points (`allocate`, `reallocate`, ...) collapse
//! every [`AllocError`] into a null pointer. The `try_*` variants keep the
//! reason.

use std::io;

/// Reasons an allocation request produced no memory.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
  /// A request for zero bytes.
  #[error("cannot allocate a zero-sized block")]
  ZeroSize,

  /// The heap source declined to grow far enough for the request.
  #[error("heap exhausted: cannot grow for a {requested} byte request")]
  HeapExhausted { requested: usize },

  /// `count * size` does not fit in `usize`.
  #[error("allocation size overflows: {count} elements of {size} bytes")]
  Overflow { count: usize, size: usize },

  /// A mapped heap region could not be reserved.
  #[error("cannot map a {capacity} byte heap region: {source}")]
  Map {
    capacity: usize,
    #[source]
    source: io::Error,
  },
}

/// Errors raised while loading or validating an [`AllocatorConfig`](crate::AllocatorConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("split factor must be at least 1, got {0}")]
  InvalidSplitFactor(usize),

  #[error("TOML parse error: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("TOML serialise error: {0}")]
  Serialize(#[from] toml::ser::Error),

  #[error("cannot read config '{path}': {source}")]
  Io {
    path: String,
    #[source]
    source: io::Error,
  },
}
