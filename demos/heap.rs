use std::ptr;

use tagheap::{FreeListAllocator, HeapSource, MappedRegion};
use tracing_subscriber::EnvFilter;

/// Prints the heap layout: one line per block, then the totals.
fn print_heap(
  label: &str,
  heap: &FreeListAllocator<MappedRegion>,
) {
  println!("\n[{label}] top = {:?}", heap.heap().source().top());
  for block in heap.blocks() {
    println!(
      "    {:?}  {:>6} bytes  {}",
      block.payload,
      block.size,
      if block.is_free { "free" } else { "used" }
    );
  }
  println!("    {}", heap.stats());
}

fn main() {
  // RUST_LOG=tagheap=trace shows every grow, split and merge.
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let region = match MappedRegion::new(1 << 20) {
    Ok(region) => region,
    Err(err) => {
      eprintln!("{err}");
      std::process::exit(1);
    }
  };
  let mut heap = FreeListAllocator::new(region);

  unsafe {
    // --------------------------------------------------------------------
    // 1) Two small allocations grow the heap one block at a time.
    // --------------------------------------------------------------------
    let first = heap.allocate(10);
    first.write(0xAB);
    let second = heap.allocate(10);
    print_heap("two 10 byte blocks", &heap);

    // --------------------------------------------------------------------
    // 2) Release the first block. It goes on the free list and is reused
    //    by the next request that fits.
    // --------------------------------------------------------------------
    heap.release(first);
    print_heap("released first", &heap);

    let reused = heap.allocate(10);
    println!(
      "\n[reuse] reused == first? {}",
      if reused == first { "Yes, it reused the freed block" } else { "No" }
    );

    // --------------------------------------------------------------------
    // 3) A large block, released and then asked for a small piece, is
    //    split. The tail returns to the free list.
    // --------------------------------------------------------------------
    let large = heap.allocate(64 * 1024);
    ptr::write_bytes(large, 0x11, 64 * 1024);
    heap.release(large);

    let piece = heap.allocate(100);
    print_heap("split a 64 KiB block", &heap);

    // --------------------------------------------------------------------
    // 4) Releasing the piece merges it back with its free tail.
    // --------------------------------------------------------------------
    heap.release(piece);
    print_heap("merged back", &heap);

    // --------------------------------------------------------------------
    // 5) Growing a block moves it and keeps its contents.
    // --------------------------------------------------------------------
    second.write(0x5A);
    let grown = heap.reallocate(second, 4096);
    println!("\n[realloc] {:?} -> {:?}, first byte = {:#X}", second, grown, grown.read());

    let zeroed = heap.zero_allocate(16, 8);
    println!("[calloc] 128 zeroed bytes at {:?}", zeroed);
    print_heap("end", &heap);
  }
}
