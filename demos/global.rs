use std::collections::HashMap;

use tagheap::LockedHeap;

// Every allocation in this program, including the standard library's,
// goes through the process break.
#[global_allocator]
static HEAP: LockedHeap = LockedHeap::sbrk();

fn main() {
  let mut words: HashMap<String, usize> = HashMap::new();
  let text = "the heap only grows and the free list is unordered so the head is the newest block";

  for word in text.split_whitespace() {
    *words.entry(word.to_string()).or_default() += 1;
  }

  let mut numbers: Vec<u64> = Vec::new();
  for n in 0..10_000u64 {
    numbers.push(n * n);
  }
  numbers.truncate(10);
  numbers.shrink_to_fit();

  // Take the snapshot before printing: formatting allocates, and the heap
  // lock must not be held while it does.
  let stats = HEAP.lock().stats();

  println!("distinct words: {}", words.len());
  println!("first squares: {numbers:?}");
  println!("{stats}");
}
