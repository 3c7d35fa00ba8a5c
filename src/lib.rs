//! # tagheap - A Boundary-Tag Free-List Allocator
//!
//! This crate provides a general-purpose dynamic memory allocator that
//! manages a single, only-growing heap region. It services the four
//! conventional requests (allocate, zero-allocate, release, reallocate)
//! with a first-fit free list, block splitting and boundary-tag
//! coalescing.
//!
//! ## Overview
//!
//! ```text
//!   Heap Layout:
//!
//!   start                                                            top
//!   │                                                                 │
//!   ▼                                                                 ▼
//!   ┌───┬──────────┬───┬───┬────────────────────┬───┬───┬──────┬───┐
//!   │ H │  used    │ F │ H │       free         │ F │ H │ used │ F │
//!   └───┴──────────┴───┴───┴────────────────────┴───┴───┴──────┴───┘
//!                          ▲
//!                          │
//!   free list head ────────┘   (links live inside free headers)
//!
//!   H = header (size, is_free, next, prev)    F = footer (size)
//! ```
//!
//! - **Allocation** scans the free list for the first block large enough.
//!   A hit much larger than the request is split and the tail goes back on
//!   the free list. A miss grows the heap by exactly one block.
//! - **Release** reads the footer just before the block to find its left
//!   neighbor and the header just after it to find its right neighbor, and
//!   merges with free neighbors according to the [`MergePolicy`].
//! - The heap only grows. Memory is never handed back to the OS.
//!
//! ## Crate Structure
//!
//! ```text
//!   tagheap
//!   ├── align      - Granularity rounding (align_to!)
//!   ├── block      - Header/footer codec and neighbor lookup
//!   ├── heap       - HeapSource (sbrk, mmap) and HeapRegion
//!   ├── free_list  - Intrusive doubly-linked free list
//!   ├── engine     - FreeListAllocator: allocate/release/realloc
//!   ├── global     - LockedHeap, a GlobalAlloc adapter
//!   ├── config     - AllocatorConfig (split/merge heuristics)
//!   ├── stats      - HeapStats and BlockInfo
//!   └── error      - AllocError, ConfigError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tagheap::{FreeListAllocator, MappedRegion};
//!
//! let mut heap = FreeListAllocator::new(MappedRegion::new(1 << 20).unwrap());
//!
//! let a = heap.allocate(10);
//! assert!(!a.is_null());
//!
//! unsafe {
//!     a.write(42);
//!     heap.release(a);
//! }
//!
//! // The freed block is reused.
//! assert_eq!(heap.allocate(10), a);
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded core**: [`FreeListAllocator`] has no internal
//!   locking; [`LockedHeap`] serialises it behind a mutex.
//! - **No shrinking**: the heap top never moves down.
//! - **Natural alignment only**: payloads are aligned to [`PAYLOAD_ALIGN`].
//! - **No misuse detection**: double release or foreign addresses are
//!   undefined behavior.
//! - **Unix-only**: requires `libc` (`sbrk`, `mmap`).

pub mod align;
pub mod block;
mod config;
mod engine;
mod error;
pub mod free_list;
mod global;
pub mod heap;
mod stats;

pub use block::PAYLOAD_ALIGN;
pub use config::{AllocatorConfig, MergePolicy};
pub use engine::{Blocks, FreeListAllocator};
pub use error::{AllocError, ConfigError};
pub use global::LockedHeap;
pub use heap::{HeapRegion, HeapSource, MappedRegion, Sbrk};
pub use stats::{BlockInfo, HeapStats};
