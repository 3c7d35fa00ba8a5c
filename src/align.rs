/// Rounds `value` up to the next multiple of `granularity`.
///
/// `granularity` must be a power of two. The caller is responsible for
/// keeping `value + granularity - 1` within `usize`.
///
/// # Examples
///
/// ```rust
/// use tagheap::align_to;
///
/// assert_eq!(align_to!(10, 16), 16);
/// assert_eq!(align_to!(32, 16), 32);
/// assert_eq!(align_to!(33, 32), 64);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $granularity:expr) => {
    ($value + $granularity - 1) & !($granularity - 1)
  };
}

#[cfg(test)]
mod tests {
  use crate::block::HEADER_SIZE;

  #[test]
  fn test_align_to_granularities() {
    // (value, granularity, expected)
    let cases = [
      (1usize, 16usize, 16usize),
      (10, 16, 16),
      (16, 16, 16),
      (17, 16, 32),
      (1, 32, 32),
      (10, 32, 32),
      (32, 32, 32),
      (33, 32, 64),
      (1000, 32, 1024),
      (0, 32, 0),
      (4095, 4096, 4096),
    ];

    for (value, granularity, expected) in cases {
      assert_eq!(align_to!(value, granularity), expected, "{value} to {granularity}");
    }
  }

  #[test]
  fn test_requests_round_to_header_width() {
    for value in 1..=4 * HEADER_SIZE {
      let rounded = align_to!(value, HEADER_SIZE);

      assert_eq!(rounded % HEADER_SIZE, 0);
      assert!(rounded >= value);
      assert!(rounded - value < HEADER_SIZE);
    }
  }
}
