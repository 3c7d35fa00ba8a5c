//! Boundary-tag metadata codec.
//!
//! Every block on the heap is laid out as:
//!
//! ```text
//!   ┌──────────────────┬───────────────────────────┬──────────┐
//!   │      Header      │          Payload          │  Footer  │
//!   │ size, is_free,   │     `header.size` bytes   │   size   │
//!   │ next, prev       │                           │          │
//!   └──────────────────┴───────────────────────────┴──────────┘
//!   ▲                  ▲                           ▲
//!   header             payload_of(header)          footer_of(header)
//! ```
//!
//! The footer repeats the payload size so the block to the right can find
//! this block's header without scanning the heap. Its slot is as wide as
//! the payload alignment, which keeps every header, and so every payload,
//! aligned to [`PAYLOAD_ALIGN`] however blocks are split or merged.
//! Nothing in this module validates its input: addresses are trusted to
//! come from the engine.

use std::{mem, ptr};

/// Metadata record placed immediately before every payload.
///
/// `next` and `prev` are only meaningful while the block is on the free
/// list. A used block keeps both null.
#[repr(C, align(16))]
pub struct Header {
  pub size: usize,
  pub is_free: bool,
  pub next: *mut Header,
  pub prev: *mut Header,
}

impl Header {
  pub fn used(size: usize) -> Self {
    Self {
      size,
      is_free: false,
      next: ptr::null_mut(),
      prev: ptr::null_mut(),
    }
  }
}

/// Width of a header, and the granularity every request is rounded up to.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Alignment guaranteed for every payload address. Matches what `malloc`
/// promises on common 64-bit targets.
pub const PAYLOAD_ALIGN: usize = mem::align_of::<Header>();

/// Width of the trailing size tag's slot. The size is stored in its first
/// word.
pub const FOOTER_SIZE: usize = PAYLOAD_ALIGN;

/// Bytes a block occupies on the heap beyond its payload.
pub const OVERHEAD: usize = HEADER_SIZE + FOOTER_SIZE;

const _: () = assert!(HEADER_SIZE.is_power_of_two());
const _: () = assert!(HEADER_SIZE % PAYLOAD_ALIGN == 0 && OVERHEAD % PAYLOAD_ALIGN == 0);
const _: () = assert!(FOOTER_SIZE >= mem::size_of::<usize>());

/// Returns the header that owns `payload`.
pub unsafe fn header_of(payload: *mut u8) -> *mut Header {
  unsafe { payload.sub(HEADER_SIZE) as *mut Header }
}

/// Returns the first payload byte of `header`'s block.
pub unsafe fn payload_of(header: *mut Header) -> *mut u8 {
  unsafe { (header as *mut u8).add(HEADER_SIZE) }
}

/// Returns the footer position of `header`'s block, as sized right now.
pub unsafe fn footer_of(header: *mut Header) -> *mut usize {
  unsafe { payload_of(header).add((*header).size) as *mut usize }
}

/// Stores `size` in the header and mirrors it into the footer when the
/// footer lies below `top`.
pub unsafe fn write_size(
  header: *mut Header,
  size: usize,
  top: *mut u8,
) {
  unsafe {
    (*header).size = size;

    let footer = footer_of(header);
    if (footer as usize) < top as usize {
      footer.write(size);
    }
  }
}

/// Returns the header directly after `header`'s footer.
///
/// The result may point at or past the heap top; callers bound it.
pub unsafe fn next_header(header: *mut Header) -> *mut Header {
  unsafe { (footer_of(header) as *mut u8).add(FOOTER_SIZE) as *mut Header }
}

/// Follows the footer stored just before `header` back to the header of
/// the block on its left.
///
/// Returns null when `header` sits too close to `start` to have a left
/// neighbor, or when the stored size would lead before `start`.
pub unsafe fn prev_header(
  header: *mut Header,
  start: *mut u8,
) -> *mut Header {
  let address = header as usize;
  let start = start as usize;

  if address < start + OVERHEAD + HEADER_SIZE {
    return ptr::null_mut();
  }

  unsafe {
    let footer = (header as *mut u8).sub(FOOTER_SIZE) as *mut usize;
    let left_size = footer.read();

    match left_size.checked_add(OVERHEAD) {
      Some(span) if address - start >= span => (header as *mut u8).sub(span) as *mut Header,
      _ => ptr::null_mut(),
    }
  }
}
