//! Metadata slot shared by live blocks and free nodes.
//!
//! ```text
//!   word 0                    word 1
//!   ┌────────────────────────┬────────────────────────┐
//!   │ capacity (payload)     │ SENTINEL               │  Allocated
//!   ├────────────────────────┼────────────────────────┤
//!   │ span (whole block)     │ next free offset | 0   │  Free
//!   └────────────────────────┴────────────────────────┘
//! ```

/// Size of the metadata slot that prefixes every block, live or free.
pub const HEADER_SIZE: usize = 2 * WORD;

/// Smallest span that can hold a free node.
pub const MIN_FREE_NODE: usize = HEADER_SIZE;

/// Integrity tag stamped into the header of every live block.
pub const SENTINEL: u64 = 0x5AFE_B10C_C0DE_F00D;

const WORD: usize = size_of::<u64>();

/// Encoded `next` value of the last node in the free list. Offset 0 can
/// never be a successor since the list is sorted by ascending address.
const NIL: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
  /// Header of a live block: payload capacity plus integrity tag.
  Allocated { size: usize, tag: u64 },
  /// Free node: full span of the free block and the next node in the list.
  Free { size: usize, next: Option<usize> },
}

impl Slot {
  pub fn allocated(size: usize) -> Self {
    Slot::Allocated {
      size,
      tag: SENTINEL,
    }
  }

  pub fn free(
    size: usize,
    next: Option<usize>,
  ) -> Self {
    Slot::Free { size, next }
  }

  /// Decodes the slot stored at `offset`.
  ///
  /// The tag word decides the interpretation: anything other than
  /// [`SENTINEL`] is read as a free node.
  pub fn read(
    mem: &[u8],
    offset: usize,
  ) -> Self {
    let size = read_word(mem, offset) as usize;
    let tag = read_word(mem, offset + WORD);

    if tag == SENTINEL {
      Slot::Allocated { size, tag }
    } else {
      let next = (tag != NIL).then_some(tag as usize);
      Slot::Free { size, next }
    }
  }

  pub fn write(
    self,
    mem: &mut [u8],
    offset: usize,
  ) {
    let (first, second) = match self {
      Slot::Allocated { size, tag } => (size as u64, tag),
      Slot::Free { size, next } => (size as u64, next.map_or(NIL, |n| n as u64)),
    };

    write_word(mem, offset, first);
    write_word(mem, offset + WORD, second);
  }

  /// Bytes the block occupies in the region, header included.
  pub fn span(&self) -> usize {
    match *self {
      Slot::Allocated { size, .. } => HEADER_SIZE + size,
      Slot::Free { size, .. } => size,
    }
  }
}

fn read_word(
  mem: &[u8],
  offset: usize,
) -> u64 {
  let mut bytes = [0u8; WORD];
  bytes.copy_from_slice(&mem[offset..offset + WORD]);
  u64::from_ne_bytes(bytes)
}

fn write_word(
  mem: &mut [u8],
  offset: usize,
  value: u64,
) {
  mem[offset..offset + WORD].copy_from_slice(&value.to_ne_bytes());
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_allocated_slot_round_trips_through_memory() {
    let mut mem = vec![0u8; 64];

    Slot::allocated(40).write(&mut mem, 8);

    assert_eq!(
      Slot::read(&mem, 8),
      Slot::Allocated {
        size: 40,
        tag: SENTINEL
      }
    );
    assert_eq!(Slot::read(&mem, 8).span(), 56);
  }

  #[test]
  fn test_free_slot_encodes_missing_successor_as_nil() {
    let mut mem = vec![0xFFu8; 32];

    Slot::free(32, None).write(&mut mem, 0);
    assert_eq!(Slot::read(&mem, 0), Slot::free(32, None));

    Slot::free(16, Some(16)).write(&mut mem, 0);
    assert_eq!(Slot::read(&mem, 0), Slot::free(16, Some(16)));
  }

  #[test]
  fn test_overwriting_header_with_free_node_clears_sentinel() {
    let mut mem = vec![0u8; 48];

    Slot::allocated(32).write(&mut mem, 0);
    Slot::free(48, None).write(&mut mem, 0);

    assert!(matches!(Slot::read(&mem, 0), Slot::Free { size: 48, .. }));
  }

  #[test]
  fn test_tampered_tag_no_longer_decodes_as_allocated() {
    let mut mem = vec![0u8; 48];

    Slot::allocated(32).write(&mut mem, 0);
    mem[HEADER_SIZE - 1] ^= 0xFF;

    assert!(!matches!(Slot::read(&mem, 0), Slot::Allocated { .. }));
  }
}
