//! Intrusive, unordered list of free blocks.
//!
//! Links live in the free blocks' own headers. Blocks are pushed at the
//! head on release and never reordered, so the head is always the most
//! recently freed or merged block.
//!
//! ```text
//!   head ──► ┌──────┐ ◄──► ┌──────┐ ◄──► ┌──────┐ ──► null
//!            │ free │      │ free │      │ free │
//!            └──────┘      └──────┘      └──────┘
//! ```

use std::ptr;

use crate::block::Header;

pub struct FreeList {
  head: *mut Header,
}

impl FreeList {
  pub const fn new() -> Self {
    Self { head: ptr::null_mut() }
  }

  pub fn head(&self) -> *mut Header {
    self.head
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_null()
  }

  /// Marks `block` free and links it in as the new head.
  pub unsafe fn insert_front(
    &mut self,
    block: *mut Header,
  ) {
    unsafe {
      (*block).is_free = true;
      (*block).prev = ptr::null_mut();
      (*block).next = self.head;

      if !self.head.is_null() {
        (*self.head).prev = block;
      }

      self.head = block;
    }
  }

  /// Unlinks `block` and clears its links. `block` must be on this list.
  pub unsafe fn remove(
    &mut self,
    block: *mut Header,
  ) {
    unsafe {
      let next = (*block).next;
      let prev = (*block).prev;

      if prev.is_null() {
        self.head = next;
      } else {
        (*prev).next = next;
      }

      if !next.is_null() {
        (*next).prev = prev;
      }

      (*block).next = ptr::null_mut();
      (*block).prev = ptr::null_mut();
    }
  }

  /// Returns the first block from the head whose payload holds at least
  /// `min_size` bytes, or null.
  pub unsafe fn find_first_fit(
    &self,
    min_size: usize,
  ) -> *mut Header {
    unsafe {
      let mut current = self.head;

      while !current.is_null() {
        if (*current).size >= min_size {
          return current;
        }
        current = (*current).next;
      }

      ptr::null_mut()
    }
  }

  /// Number of linked blocks. Walks the whole list.
  pub fn len(&self) -> usize {
    let mut count = 0;
    let mut current = self.head;

    while !current.is_null() {
      count += 1;
      current = unsafe { (*current).next };
    }

    count
  }
}

impl Default for FreeList {
  fn default() -> Self {
    Self::new()
  }
}
