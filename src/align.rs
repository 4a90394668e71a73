/// Payload alignment in bytes. Every block span is a multiple of this.
pub const ALIGNMENT: usize = 8;

/// Rounds the given size up to the payload alignment ([`ALIGNMENT`]).
///
/// # Examples
///
/// ```rust
/// use fitalloc::align;
///
/// assert_eq!(align!(1), 8);
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(16), 16);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, $crate::align::ALIGNMENT)
  };
}

/// Rounds the given size up to a multiple of `boundary`, which must be a
/// power of two.
///
/// ```rust
/// use fitalloc::align_to;
///
/// assert_eq!(align_to!(1, 4096), 4096);
/// assert_eq!(align_to!(8192, 4096), 8192);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $boundary:expr) => {
    ($value + $boundary - 1) & !($boundary - 1)
  };
}

#[cfg(test)]
mod tests {
  use super::ALIGNMENT;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ALIGNMENT * i + 1)..=(ALIGNMENT * (i + 1));

      let expected_alignment = ALIGNMENT * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_align_to_page() {
    assert_eq!(align_to!(0usize, 4096usize), 0);
    assert_eq!(align_to!(1usize, 4096usize), 4096);
    assert_eq!(align_to!(4097usize, 4096usize), 8192);
    assert_eq!(align_to!(10_000usize, 16384usize), 16384);
  }
}
