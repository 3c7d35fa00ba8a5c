//! The allocation engine.
//!
//! [`FreeListAllocator`] serves the four conventional requests on top of a
//! [`HeapRegion`]:
//!
//! - **allocate**: first fit from the free list, otherwise grow the heap by
//!   exactly one block. Oversized hits are split.
//! - **zero_allocate**: allocate, then zero the whole payload.
//! - **release**: coalesce with free neighbors found through boundary
//!   tags, then push on the free list.
//! - **reallocate**: keep the block if it is already big enough, otherwise
//!   move the contents into a fresh block.
//!
//! Failures come back as a null pointer from the conventional entry
//! points, or as an [`AllocError`] from the `try_*` ones. A failed growth
//! leaves every header and free-list link untouched.

use std::{ptr, ptr::NonNull};

use crate::{
  align_to,
  block::{self, FOOTER_SIZE, HEADER_SIZE, Header, OVERHEAD},
  config::{AllocatorConfig, MergePolicy},
  error::AllocError,
  free_list::FreeList,
  heap::{HeapRegion, HeapSource},
  stats::{BlockInfo, HeapStats},
};

/// Largest request whose rounded size plus metadata still fits in `isize`.
const MAX_REQUEST: usize = isize::MAX as usize - OVERHEAD - HEADER_SIZE;

/// A single-threaded, boundary-tag, first-fit allocator.
///
/// All state lives in the value, so independent heaps can coexist. Callers
/// sharing one instance across threads must serialise access themselves;
/// see [`LockedHeap`](crate::LockedHeap).
pub struct FreeListAllocator<S: HeapSource> {
  heap: HeapRegion<S>,
  free: FreeList,
  config: AllocatorConfig,
}

impl<S: HeapSource> FreeListAllocator<S> {
  pub const fn new(source: S) -> Self {
    Self::with_config(source, AllocatorConfig::DEFAULT)
  }

  pub const fn with_config(
    source: S,
    config: AllocatorConfig,
  ) -> Self {
    Self {
      heap: HeapRegion::new(source),
      free: FreeList::new(),
      config,
    }
  }

  pub fn config(&self) -> &AllocatorConfig {
    &self.config
  }

  pub fn heap(&self) -> &HeapRegion<S> {
    &self.heap
  }

  pub fn free_list(&self) -> &FreeList {
    &self.free
  }

  /// Allocates at least `requested` uninitialised bytes.
  pub fn try_allocate(
    &mut self,
    requested: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if requested == 0 {
      return Err(AllocError::ZeroSize);
    }

    if requested > MAX_REQUEST || !self.heap.ensure_started() {
      return Err(AllocError::HeapExhausted { requested });
    }

    let size = align_to!(requested, HEADER_SIZE);

    unsafe {
      let found = self.free.find_first_fit(size);

      if !found.is_null() {
        self.free.remove(found);
        (*found).is_free = false;

        if self.config.allows_split((*found).size, size) {
          self.split_block(found, size);
        }

        return Ok(NonNull::new_unchecked(block::payload_of(found)));
      }

      let base = self
        .heap
        .grow(OVERHEAD + size)
        .ok_or(AllocError::HeapExhausted { requested })?;

      let header = base.as_ptr() as *mut Header;
      header.write(Header::used(size));
      block::write_size(header, size, self.heap.current_top());

      Ok(NonNull::new_unchecked(block::payload_of(header)))
    }
  }

  /// Allocates at least `requested` bytes, or returns null.
  pub fn allocate(
    &mut self,
    requested: usize,
  ) -> *mut u8 {
    match self.try_allocate(requested) {
      Ok(payload) => payload.as_ptr(),
      Err(err) => {
        tracing::debug!(requested, %err, "allocation refused");
        ptr::null_mut()
      }
    }
  }

  /// Allocates `count * size` bytes and zeroes the whole payload.
  pub fn try_zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let total = count.checked_mul(size).ok_or(AllocError::Overflow { count, size })?;

    let payload = self.try_allocate(total)?;

    unsafe {
      let header = block::header_of(payload.as_ptr());
      ptr::write_bytes(payload.as_ptr(), 0, (*header).size);
    }

    Ok(payload)
  }

  /// Allocates `count * size` zeroed bytes, or returns null.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> *mut u8 {
    match self.try_zero_allocate(count, size) {
      Ok(payload) => payload.as_ptr(),
      Err(err) => {
        tracing::debug!(count, size, %err, "zeroed allocation refused");
        ptr::null_mut()
      }
    }
  }

  /// Returns a block to the allocator. Null is ignored.
  ///
  /// # Safety
  ///
  /// `payload` must be null or an address returned by this allocator that
  /// has not been released since.
  pub unsafe fn release(
    &mut self,
    payload: *mut u8,
  ) {
    if payload.is_null() {
      return;
    }

    unsafe { self.release_block(block::header_of(payload)) }
  }

  /// Resizes the block at `payload` to hold at least `new_size` bytes.
  ///
  /// Null `payload` allocates; zero `new_size` releases and returns null.
  /// A block already large enough is returned unchanged. Otherwise the
  /// block's full current payload is copied to a new block and the old
  /// one released; if that allocation fails, null is returned and the
  /// old block is left as it was.
  ///
  /// # Safety
  ///
  /// Same contract as [`release`](Self::release).
  pub unsafe fn reallocate(
    &mut self,
    payload: *mut u8,
    new_size: usize,
  ) -> *mut u8 {
    if payload.is_null() {
      return self.allocate(new_size);
    }

    if new_size == 0 {
      unsafe { self.release(payload) };
      return ptr::null_mut();
    }

    unsafe {
      let old_size = (*block::header_of(payload)).size;

      if old_size >= new_size {
        return payload;
      }

      let moved = self.allocate(new_size);
      if moved.is_null() {
        return ptr::null_mut();
      }

      ptr::copy_nonoverlapping(payload, moved, old_size);
      self.release(payload);

      moved
    }
  }

  /// Shrinks `header` to `keep` bytes and releases the tail as its own
  /// block. Skipped when the tail could not hold a minimum block.
  unsafe fn split_block(
    &mut self,
    header: *mut Header,
    keep: usize,
  ) {
    unsafe {
      let old_size = (*header).size;

      let rest = match old_size.checked_sub(keep + OVERHEAD) {
        Some(rest) if rest >= HEADER_SIZE => rest,
        _ => return,
      };

      let top = self.heap.current_top();
      block::write_size(header, keep, top);

      let remainder = block::next_header(header);
      remainder.write(Header::used(rest));
      block::write_size(remainder, rest, top);

      tracing::trace!(block = ?header, keep, rest, "split block");

      self.release_block(remainder);
    }
  }

  unsafe fn release_block(
    &mut self,
    header: *mut Header,
  ) {
    unsafe {
      let top = self.heap.current_top();
      let size = (*header).size;
      let left = self.free_left_neighbor(header);
      let right = self.free_right_neighbor(header, top);

      match self.config.merge_policy {
        MergePolicy::SizeGated => {
          if !left.is_null() && self.config.allows_merge((*left).size, size) {
            self.absorb_into_left(left, header, top);
            return;
          }

          if !right.is_null() && self.config.allows_merge((*right).size, size) {
            self.absorb_right(header, right, top);
          }
        }
        MergePolicy::Always => {
          if !right.is_null() {
            self.absorb_right(header, right, top);
          }

          if !left.is_null() {
            self.absorb_into_left(left, header, top);
            return;
          }
        }
      }

      self.free.insert_front(header);
      tracing::trace!(block = ?header, size = (*header).size, "block freed");
    }
  }

  /// Grows free `left` over `header`. `left` keeps its free-list slot.
  unsafe fn absorb_into_left(
    &mut self,
    left: *mut Header,
    header: *mut Header,
    top: *mut u8,
  ) {
    unsafe {
      let merged = (*left).size + (*header).size + OVERHEAD;
      block::write_size(left, merged, top);
      tracing::trace!(block = ?left, absorbed = ?header, merged, "merged into left neighbor");
    }
  }

  /// Unlinks free `right` and grows `header` over it.
  unsafe fn absorb_right(
    &mut self,
    header: *mut Header,
    right: *mut Header,
    top: *mut u8,
  ) {
    unsafe {
      self.free.remove(right);
      (*right).is_free = false;

      let merged = (*header).size + (*right).size + OVERHEAD;
      block::write_size(header, merged, top);
      tracing::trace!(block = ?header, absorbed = ?right, merged, "merged right neighbor");
    }
  }

  unsafe fn free_left_neighbor(
    &self,
    header: *mut Header,
  ) -> *mut Header {
    unsafe {
      let left = block::prev_header(header, self.heap.left_bound());

      if !left.is_null() && (*left).is_free {
        left
      } else {
        ptr::null_mut()
      }
    }
  }

  unsafe fn free_right_neighbor(
    &self,
    header: *mut Header,
    top: *mut u8,
  ) -> *mut Header {
    unsafe {
      let right = block::next_header(header);

      if (right as usize).saturating_add(HEADER_SIZE) >= top as usize {
        return ptr::null_mut();
      }

      if (*right).is_free { right } else { ptr::null_mut() }
    }
  }

  /// Walks every block from the heap start to its top.
  pub fn blocks(&self) -> Blocks<'_, S> {
    Blocks {
      heap: &self.heap,
      current: self.heap.left_bound() as *mut Header,
    }
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      heap_bytes: self.heap.size(),
      free_list_len: self.free.len(),
      ..HeapStats::default()
    };

    for block in self.blocks() {
      stats.blocks += 1;

      if block.is_free {
        stats.free_blocks += 1;
        stats.free_bytes += block.size;
      } else {
        stats.used_blocks += 1;
      }
    }

    stats
  }
}

// All raw pointers point into memory owned by the heap source.
unsafe impl<S: HeapSource + Send> Send for FreeListAllocator<S> {}

/// Iterator over the blocks of a heap, in address order.
pub struct Blocks<'a, S: HeapSource> {
  heap: &'a HeapRegion<S>,
  current: *mut Header,
}

impl<S: HeapSource> Iterator for Blocks<'_, S> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    let top = self.heap.current_top() as usize;

    if self.current.is_null() || (self.current as usize).saturating_add(HEADER_SIZE) > top {
      return None;
    }

    unsafe {
      let header = self.current;
      let end = block::footer_of(header) as usize + FOOTER_SIZE;

      self.current = if end <= top {
        block::next_header(header)
      } else {
        ptr::null_mut()
      };

      Some(BlockInfo {
        payload: block::payload_of(header),
        size: (*header).size,
        is_free: (*header).is_free,
      })
    }
  }
}
