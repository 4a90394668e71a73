use crate::placement::Strategy;

/// Default share of the largest free block below which a free block is
/// counted as a fragment.
pub const DEFAULT_SMALL_BLOCK_RATIO: f64 = 0.5;

/// Parameters of a new arena.
///
/// ```rust
/// use fitalloc::{ArenaConfig, Strategy};
///
/// let config = ArenaConfig::new(64 * 1024)
///   .strategy(Strategy::BestFit)
///   .record_events(true);
///
/// assert_eq!(config.region_size, 64 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaConfig {
  /// Requested region size; rounded up to a page multiple on init.
  pub region_size: usize,
  pub strategy: Strategy,
  pub small_block_ratio: f64,
  /// Keep a log of allocations and frees, see [`crate::Event`].
  pub record_events: bool,
}

impl ArenaConfig {
  pub fn new(region_size: usize) -> Self {
    Self {
      region_size,
      strategy: Strategy::default(),
      small_block_ratio: DEFAULT_SMALL_BLOCK_RATIO,
      record_events: false,
    }
  }

  pub fn strategy(
    mut self,
    strategy: Strategy,
  ) -> Self {
    self.strategy = strategy;
    self
  }

  /// Sets the fragmentation threshold. Values are clamped to `0.0..=1.0`.
  pub fn small_block_ratio(
    mut self,
    ratio: f64,
  ) -> Self {
    self.small_block_ratio = ratio.clamp(0.0, 1.0);
    self
  }

  pub fn record_events(
    mut self,
    record: bool,
  ) -> Self {
    self.record_events = record;
    self
  }
}
