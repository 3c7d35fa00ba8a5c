//! `GlobalAlloc` adapter.
//!
//! [`FreeListAllocator`] assumes a single caller. [`LockedHeap`] puts one
//! behind a mutex so it can serve a whole process:
//!
//! ```rust,ignore
//! use tagheap::LockedHeap;
//!
//! #[global_allocator]
//! static HEAP: LockedHeap = LockedHeap::sbrk();
//! ```
//!
//! Tracing events are emitted while the lock is held. When a `LockedHeap`
//! is the global allocator, do not install a subscriber that allocates.

use std::{
  alloc::{GlobalAlloc, Layout},
  ptr,
  sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
  block::PAYLOAD_ALIGN,
  engine::FreeListAllocator,
  heap::{HeapSource, Sbrk},
};

pub struct LockedHeap<S: HeapSource = Sbrk> {
  inner: Mutex<FreeListAllocator<S>>,
}

impl LockedHeap<Sbrk> {
  /// A heap on the process break with the default configuration.
  pub const fn sbrk() -> Self {
    Self::new(FreeListAllocator::new(Sbrk))
  }
}

impl<S: HeapSource> LockedHeap<S> {
  pub const fn new(allocator: FreeListAllocator<S>) -> Self {
    Self {
      inner: Mutex::new(allocator),
    }
  }

  /// Locks the underlying allocator. A poisoned lock is recovered.
  pub fn lock(&self) -> MutexGuard<'_, FreeListAllocator<S>> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn fits(layout: &Layout) -> bool {
    layout.align() <= PAYLOAD_ALIGN
  }
}

unsafe impl<S: HeapSource + Send> GlobalAlloc for LockedHeap<S> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if !Self::fits(&layout) {
      return ptr::null_mut();
    }
    self.lock().allocate(layout.size())
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if !Self::fits(&layout) {
      return ptr::null_mut();
    }
    self.lock().zero_allocate(1, layout.size())
  }

  unsafe fn dealloc(
    &self,
    address: *mut u8,
    _layout: Layout,
  ) {
    unsafe { self.lock().release(address) }
  }

  unsafe fn realloc(
    &self,
    address: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if !Self::fits(&layout) {
      return ptr::null_mut();
    }
    unsafe { self.lock().reallocate(address, new_size) }
  }
}
