use std::fmt;

/// Snapshot of an arena's counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
  pub alloc_count: usize,
  pub dealloc_count: usize,
  /// Blocks currently allocated.
  pub live_blocks: usize,
  /// Payload capacity of all live blocks.
  pub allocated_bytes: usize,
  /// Full span of all free nodes.
  pub free_bytes: usize,
  /// Header bytes in front of live blocks.
  pub header_overhead: usize,
  pub fragmentation_pct: f64,
}

impl fmt::Display for Stats {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "Allocations:      {}", self.alloc_count)?;
    writeln!(f, "Deallocations:    {}", self.dealloc_count)?;
    writeln!(f, "Live blocks:      {}", self.live_blocks)?;
    writeln!(f, "Allocated bytes:  {}", self.allocated_bytes)?;
    writeln!(f, "Free bytes:       {}", self.free_bytes)?;
    writeln!(f, "Header overhead:  {}", self.header_overhead)?;
    write!(f, "Fragmentation:    {:.2}%", self.fragmentation_pct)
  }
}

/// Prints the statistics of an arena to stdout.
pub fn print_stats(stats: &Stats) {
  println!("====== Memory Statistics ======");
  println!("{stats}");
  println!("===============================");
}

/// Estimates external fragmentation from the sizes of the free blocks.
///
/// Blocks smaller than `ratio` times the largest free block count as
/// fragments; the result is their share of all free bytes, in percent.
/// Without free memory there is nothing to fragment and the result is 0.
pub fn fragmentation(
  sizes: impl Iterator<Item = usize> + Clone,
  ratio: f64,
) -> f64 {
  let largest = sizes.clone().max().unwrap_or(0);
  let total: usize = sizes.clone().sum();

  if total == 0 {
    return 0.0;
  }

  let threshold = largest as f64 * ratio;
  let fragments: usize = sizes.filter(|&size| (size as f64) < threshold).sum();

  fragments as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_no_free_memory_is_not_fragmented() {
    assert_eq!(fragmentation(std::iter::empty(), 0.5), 0.0);
    assert_eq!(fragmentation([0usize].into_iter(), 0.5), 0.0);
  }

  #[test]
  fn test_single_block_is_not_fragmented() {
    assert_eq!(fragmentation([4096usize].into_iter(), 0.5), 0.0);
  }

  #[test]
  fn test_small_blocks_count_against_largest() {
    // 100 and 200 are below half of 1000; 600 is not.
    let pct = fragmentation([100usize, 1000, 200, 600].into_iter(), 0.5);

    assert!((pct - 300.0 / 1900.0 * 100.0).abs() < 1e-9);
  }

  #[test]
  fn test_ratio_is_configurable() {
    let sizes = [100usize, 1000, 200, 600];

    assert_eq!(fragmentation(sizes.into_iter(), 0.0), 0.0);
    let pct = fragmentation(sizes.into_iter(), 0.7);
    assert!((pct - 900.0 / 1900.0 * 100.0).abs() < 1e-9);
  }

  #[test]
  fn test_display_lists_every_counter() {
    let stats = Stats {
      alloc_count: 3,
      dealloc_count: 1,
      live_blocks: 2,
      allocated_bytes: 384,
      free_bytes: 7776,
      header_overhead: 32,
      fragmentation_pct: 12.5,
    };

    let text = stats.to_string();
    assert!(text.contains("Allocations:      3"));
    assert!(text.contains("Free bytes:       7776"));
    assert!(text.contains("12.50%"));
  }
}
