//! Heap introspection.

use std::fmt;

/// One block as seen by a heap walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Address handed to callers for this block.
  pub payload: *mut u8,
  /// Payload bytes recorded in the header.
  pub size: usize,
  pub is_free: bool,
}

/// A snapshot of heap layout and free-list state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct HeapStats {
  /// Bytes between the heap start and its current top.
  pub heap_bytes: usize,
  /// Blocks found walking the heap.
  pub blocks: usize,
  pub used_blocks: usize,
  pub free_blocks: usize,
  /// Payload bytes held by free blocks.
  pub free_bytes: usize,
  /// Blocks linked into the free list.
  pub free_list_len: usize,
}

impl HeapStats {
  /// Share of the heap held as free payload, in `[0.0, 1.0]`.
  pub fn free_ratio(&self) -> f64 {
    if self.heap_bytes == 0 {
      return 0.0;
    }
    self.free_bytes as f64 / self.heap_bytes as f64
  }
}

impl fmt::Display for HeapStats {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(
      f,
      "heap {} bytes, {} blocks ({} used, {} free), {} free bytes, free list {}",
      self.heap_bytes, self.blocks, self.used_blocks, self.free_blocks, self.free_bytes, self.free_list_len,
    )
  }
}
