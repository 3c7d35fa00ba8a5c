//! Heap growth.
//!
//! A [`HeapSource`] is the primitive that hands out memory at the top of a
//! contiguous, only-growing region. [`Sbrk`] is the process break;
//! [`MappedRegion`] is a private mapping with its own break, which lets
//! several heaps coexist in one process.
//!
//! ```text
//!   start                                     top
//!   │                                          │
//!   ▼                                          ▼
//!   ┌────────┬────────┬──────────┬─────────────┐ ─ ─ ─ ─ ─ ─ ─ ─ ┐
//!   │ block  │ block  │  block   │    block    │  extend(n)
//!   └────────┴────────┴──────────┴─────────────┘ ─ ─ ─ ─ ─ ─ ─ ─ ┘
//!                                              ▲
//!                                              └── returned base
//! ```

use std::{io, ptr, ptr::NonNull};

use libc::{c_void, intptr_t, sbrk};

use crate::{block::PAYLOAD_ALIGN, error::AllocError};

/// A contiguous memory region that only grows at its top.
///
/// # Safety
///
/// Implementors must guarantee that every range returned by `extend`
/// starts at the previous `top`, is readable and writable for the
/// requested length, stays valid for the lifetime of the source, and is
/// not handed to anyone else.
pub unsafe trait HeapSource {
  /// Current high-water mark.
  fn top(&self) -> *mut u8;

  /// Grows the region by `bytes` and returns the previous top, or `None`
  /// when the region cannot grow.
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>>;
}

/// The process break, moved with `sbrk(2)`.
///
/// Assumes nothing else in the process moves the break.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sbrk;

unsafe impl HeapSource for Sbrk {
  fn top(&self) -> *mut u8 {
    unsafe { sbrk(0) as *mut u8 }
  }

  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    let increment = intptr_t::try_from(bytes).ok()?;

    let address = unsafe { sbrk(increment) };

    if address == usize::MAX as *mut c_void {
      return None;
    }

    NonNull::new(address as *mut u8)
  }
}

/// A fixed-capacity anonymous mapping with its own break.
///
/// The whole capacity is reserved up front; `extend` only moves the break
/// and fails once the capacity is used up.
#[derive(Debug)]
pub struct MappedRegion {
  base: NonNull<u8>,
  capacity: usize,
  brk: usize,
}

impl MappedRegion {
  pub fn new(capacity: usize) -> Result<Self, AllocError> {
    if capacity == 0 {
      return Err(AllocError::Map {
        capacity,
        source: io::Error::from(io::ErrorKind::InvalidInput),
      });
    }

    let address = unsafe {
      libc::mmap(
        ptr::null_mut(),
        capacity,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == libc::MAP_FAILED {
      return Err(AllocError::Map {
        capacity,
        source: io::Error::last_os_error(),
      });
    }

    let base = NonNull::new(address as *mut u8).ok_or_else(|| AllocError::Map {
      capacity,
      source: io::Error::from(io::ErrorKind::AddrNotAvailable),
    })?;

    Ok(Self { base, capacity, brk: 0 })
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Bytes handed out so far.
  pub fn used(&self) -> usize {
    self.brk
  }

  pub fn base(&self) -> *mut u8 {
    self.base.as_ptr()
  }
}

unsafe impl HeapSource for MappedRegion {
  fn top(&self) -> *mut u8 {
    unsafe { self.base.as_ptr().add(self.brk) }
  }

  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    let remaining = self.capacity - self.brk;

    if bytes > remaining {
      return None;
    }

    let previous = self.top();
    self.brk += bytes;

    NonNull::new(previous)
  }
}

impl Drop for MappedRegion {
  fn drop(&mut self) {
    unsafe {
      libc::munmap(self.base.as_ptr() as *mut c_void, self.capacity);
    }
  }
}

// The mapping is owned exclusively by this value.
unsafe impl Send for MappedRegion {}

/// The managed heap: a [`HeapSource`] plus the first address ever used.
#[derive(Debug)]
pub struct HeapRegion<S: HeapSource> {
  source: S,
  start: *mut u8,
}

impl<S: HeapSource> HeapRegion<S> {
  pub const fn new(source: S) -> Self {
    Self {
      source,
      start: ptr::null_mut(),
    }
  }

  pub fn is_started(&self) -> bool {
    !self.start.is_null()
  }

  /// Captures `start` on first use, padding the source up to
  /// [`PAYLOAD_ALIGN`] so every header lands naturally aligned.
  ///
  /// Returns `false` if the padding itself could not be obtained.
  pub fn ensure_started(&mut self) -> bool {
    if self.is_started() {
      return true;
    }

    let top = self.source.top();
    let pad = top.align_offset(PAYLOAD_ALIGN);

    if pad != 0 && self.source.extend(pad).is_none() {
      return false;
    }

    self.start = unsafe { top.add(pad) };
    tracing::trace!(start = ?self.start, pad, "heap region started");

    true
  }

  /// The current top of the grown region, queried from the source.
  pub fn current_top(&self) -> *mut u8 {
    self.source.top()
  }

  /// Grows the region by `extra_bytes`, returning the base of the new range.
  pub fn grow(
    &mut self,
    extra_bytes: usize,
  ) -> Option<NonNull<u8>> {
    let base = self.source.extend(extra_bytes)?;
    tracing::trace!(base = ?base, extra_bytes, top = ?self.current_top(), "heap grown");
    Some(base)
  }

  /// The first address ever granted, or null before the first allocation.
  pub fn left_bound(&self) -> *mut u8 {
    self.start
  }

  /// Whether `address` lies in `[start, top)`.
  pub fn contains(
    &self,
    address: *const u8,
  ) -> bool {
    let address = address as usize;
    self.is_started() && address >= self.start as usize && address < self.current_top() as usize
  }

  /// Bytes between `start` and the current top.
  pub fn size(&self) -> usize {
    if !self.is_started() {
      return 0;
    }
    self.current_top() as usize - self.start as usize
  }

  pub fn source(&self) -> &S {
    &self.source
  }
}

// `start` is a plain address into memory owned by `source`.
unsafe impl<S: HeapSource + Send> Send for HeapRegion<S> {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sbrk_declines_requests_beyond_isize() {
    let mut source = Sbrk;
    let top = source.top();

    assert!(source.extend(usize::MAX).is_none());
    assert!(source.extend(isize::MAX as usize + 1).is_none());
    assert_eq!(source.top(), top);
  }

  #[test]
  fn test_sbrk_failure_maps_to_none() {
    let mut source = Sbrk;
    let top = source.top();

    // Fits in intptr_t, so the call is made, but the kernel refuses it.
    assert!(source.extend(isize::MAX as usize).is_none());
    assert_eq!(source.top(), top);
  }

  #[test]
  fn test_mapped_region_grows_contiguously() {
    let mut region = MappedRegion::new(4096).unwrap();
    let base = region.base();

    assert_eq!(region.top(), base);

    let first = region.extend(100).unwrap();
    assert_eq!(first.as_ptr(), base);

    let second = region.extend(28).unwrap();
    assert_eq!(second.as_ptr() as usize, base as usize + 100);
    assert_eq!(region.top() as usize, base as usize + 128);
    assert_eq!(region.used(), 128);
  }

  #[test]
  fn test_mapped_region_declines_past_capacity() {
    let mut region = MappedRegion::new(256).unwrap();

    assert!(region.extend(200).is_some());
    let top = region.top();

    assert!(region.extend(57).is_none());
    assert_eq!(region.top(), top);

    assert!(region.extend(56).is_some());
    assert!(region.extend(1).is_none());
  }

  #[test]
  fn test_mapped_region_memory_is_writable() {
    let mut region = MappedRegion::new(4096).unwrap();
    let base = region.extend(64).unwrap().as_ptr();

    unsafe {
      ptr::write_bytes(base, 0x5A, 64);
      assert!((0..64).all(|i| *base.add(i) == 0x5A));
    }
  }

  #[test]
  fn test_zero_capacity_rejected() {
    assert!(matches!(
      MappedRegion::new(0),
      Err(AllocError::Map { capacity: 0, .. })
    ));
  }

  #[test]
  fn test_heap_region_start_is_lazy() {
    let mut heap = HeapRegion::new(MappedRegion::new(4096).unwrap());

    assert!(!heap.is_started());
    assert!(heap.left_bound().is_null());
    assert_eq!(heap.size(), 0);

    assert!(heap.ensure_started());
    let start = heap.left_bound();
    assert_eq!(start, heap.source().base());

    heap.grow(64).unwrap();
    assert!(heap.ensure_started());
    assert_eq!(heap.left_bound(), start);
    assert_eq!(heap.size(), 64);
  }

  #[test]
  fn test_heap_region_pads_misaligned_start() {
    let mut source = MappedRegion::new(4096).unwrap();
    source.extend(3).unwrap();

    let mut heap = HeapRegion::new(source);
    assert!(heap.ensure_started());

    let start = heap.left_bound();
    assert_eq!(start as usize % PAYLOAD_ALIGN, 0);
    assert_eq!(start, heap.current_top());
  }

  #[test]
  fn test_heap_region_contains() {
    let mut heap = HeapRegion::new(MappedRegion::new(4096).unwrap());
    heap.ensure_started();

    let base = heap.grow(32).unwrap().as_ptr();

    assert!(heap.contains(base));
    assert!(heap.contains(unsafe { base.add(31) }));
    assert!(!heap.contains(unsafe { base.add(32) }));
  }

  #[test]
  fn test_heap_region_grow_failure_keeps_top() {
    let mut heap = HeapRegion::new(MappedRegion::new(128).unwrap());
    heap.ensure_started();

    let top = heap.current_top();
    assert!(heap.grow(256).is_none());
    assert_eq!(heap.current_top(), top);
  }
}
