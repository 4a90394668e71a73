use std::io;

use thiserror::Error;

/// Failure of the external collaborator that reserves the raw region.
#[derive(Debug, Error)]
#[error("failed to reserve {size} bytes: {source}")]
pub struct BackingStoreError {
  pub size: usize,
  #[source]
  pub source: io::Error,
}

/// Errors raised while setting up a region.
#[derive(Debug, Error)]
pub enum InitError {
  /// A region is already installed. The existing region stays usable.
  #[error("memory region is already initialized")]
  AlreadyInitialized,
  /// The requested region size is zero or cannot be rounded to a page.
  #[error("invalid region size: {0}")]
  InvalidSize(usize),
  /// The backing buffer could not be acquired.
  #[error("backing store error: {0}")]
  BackingStore(#[from] BackingStoreError),
}

/// Reasons an allocation request produced no block. None of them are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  #[error("memory region is not initialized")]
  NotInitialized,
  /// The request was zero bytes or larger than the free memory left.
  #[error("requested size {0} is invalid or exceeds available memory")]
  ZeroOrOversizedRequest(usize),
  /// No free block is large enough for the request.
  #[error("no sufficient free block for {0} bytes")]
  OutOfMemory(usize),
}

/// A block handed to `free` or `realloc` failed its integrity check: it was
/// never allocated, was already freed, or its header was overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("memory corruption or double free detected at offset {offset:#x}")]
pub struct CorruptionDetected {
  /// Payload offset of the offending block.
  pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReallocError {
  /// Relocation could not allocate; the original block is untouched.
  #[error(transparent)]
  Alloc(#[from] AllocError),
  #[error(transparent)]
  Corruption(#[from] CorruptionDetected),
}

/// A structural invariant of the heap that [`crate::Arena::verify`] found
/// broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapViolation {
  /// Free list is not strictly address-ascending.
  #[error("free node {node:#x} is followed by lower node {next:#x}")]
  Unordered { node: usize, next: usize },
  /// Two free nodes touch and were never merged.
  #[error("free nodes {node:#x} and {next:#x} are adjacent")]
  Uncoalesced { node: usize, next: usize },
  /// A free node extends past the end of the region.
  #[error("free node {node:#x} of {size} bytes exceeds the region")]
  OutOfBounds { node: usize, size: usize },
  /// The physical walk does not tile the region exactly.
  #[error("block at {offset:#x} does not tile the region")]
  BrokenTiling { offset: usize },
  /// The free list and the physical walk disagree about a free block.
  #[error("free block at {offset:#x} is not on the free list")]
  Unlisted { offset: usize },
  /// Live and free bytes do not add up to the region size.
  #[error("accounted {accounted} bytes of a {total} byte region")]
  Conservation { accounted: usize, total: usize },
}

#[cfg(test)]
mod tests {
  use std::error::Error as _;

  use super::*;

  #[test]
  fn test_backing_failure_chains_into_init_error() {
    let err = InitError::from(BackingStoreError {
      size: 4096,
      source: io::Error::new(io::ErrorKind::OutOfMemory, "no pages left"),
    });

    assert_eq!(
      err.to_string(),
      "backing store error: failed to reserve 4096 bytes: no pages left"
    );
    let backing = err.source().unwrap();
    assert_eq!(backing.source().unwrap().to_string(), "no pages left");
  }

  #[test]
  fn test_realloc_error_displays_inner_error() {
    let err = ReallocError::from(CorruptionDetected { offset: 0x40 });

    assert_eq!(
      err.to_string(),
      "memory corruption or double free detected at offset 0x40"
    );
    assert_eq!(
      ReallocError::from(AllocError::OutOfMemory(64)).to_string(),
      "no sufficient free block for 64 bytes"
    );
  }
}
