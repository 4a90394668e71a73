use crate::{
  align,
  align::ALIGNMENT,
  align_to,
  backing::{Backing, MmapBacking, page_size},
  block::{HEADER_SIZE, MIN_FREE_NODE, Slot},
  config::ArenaConfig,
  error::{AllocError, CorruptionDetected, HeapViolation, InitError, ReallocError},
  event::{self, Event, EventKind},
  free_list::{FreeList, FreeNode, Nodes, capacity},
  placement::{Placement, Strategy},
  stats::{self, Stats},
};

/// Opaque handle to an allocation: the offset of its payload in the region.
///
/// Handles are validated on every use, so a forged or stale one is reported
/// as corruption rather than trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ptr(usize);

impl Ptr {
  pub fn from_offset(offset: usize) -> Self {
    Self(offset)
  }

  pub fn offset(self) -> usize {
    self.0
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
  Free,
  Allocated { capacity: usize },
}

/// A block found by walking the region from its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Offset of the block's metadata slot.
  pub offset: usize,
  /// Full span, header included.
  pub span: usize,
  pub state: BlockState,
}

/// A single region managed by an explicit, address-ordered free list.
///
/// ```text
///   ┌────────┬─────────┬────────┬───────────────┬────────┬──────────────┐
///   │ header │ payload │  free  │ (free space)  │ header │   payload    │
///   └────────┴─────────┴───┬────┴───────────────┴────────┴──────────────┘
///                          │
///   head ──────────────────┘   free nodes link to the next higher one
/// ```
pub struct Arena<B: Backing = MmapBacking> {
  backing: B,
  free_list: FreeList,
  placement: Box<dyn Placement>,
  strategy: Strategy,
  small_block_ratio: f64,
  allocated_bytes: usize,
  free_bytes: usize,
  alloc_count: usize,
  dealloc_count: usize,
  events: Option<Vec<Event>>,
}

impl Arena {
  /// Reserves a region from the operating system with `mmap(2)`.
  pub fn init(config: ArenaConfig) -> Result<Self, InitError> {
    Self::with_backing(config)
  }
}

impl<B: Backing> Arena<B> {
  /// Reserves a region from the given backing store.
  ///
  /// The size is rounded up to a multiple of the page size and the whole
  /// region starts out as one free node.
  pub fn with_backing(config: ArenaConfig) -> Result<Self, InitError> {
    let page = page_size();

    if config.region_size == 0 || config.region_size > usize::MAX - page {
      return Err(InitError::InvalidSize(config.region_size));
    }

    let size = align_to!(config.region_size, page);
    let mut backing = B::reserve(size)?;
    let free_list = FreeList::spanning(backing.as_mut_slice());

    log::debug!(
      "initialized {} byte region (page size {}) using {}",
      size,
      page,
      config.strategy
    );

    Ok(Self {
      free_bytes: backing.len(),
      backing,
      free_list,
      placement: config.strategy.placement(),
      strategy: config.strategy,
      small_block_ratio: config.small_block_ratio,
      allocated_bytes: 0,
      alloc_count: 0,
      dealloc_count: 0,
      events: config.record_events.then(Vec::new),
    })
  }

  pub fn total_size(&self) -> usize {
    self.backing.len()
  }

  pub fn strategy(&self) -> Strategy {
    self.strategy
  }

  /// Allocates a block with room for at least `size` bytes.
  pub fn alloc(
    &mut self,
    size: usize,
  ) -> Result<Ptr, AllocError> {
    if size == 0 || size > self.free_bytes {
      let err = AllocError::ZeroOrOversizedRequest(size);
      log::warn!("{err}");
      return Err(err);
    }

    let required = HEADER_SIZE + align!(size);
    let mem = self.backing.as_mut_slice();

    let Some(candidate) = self.placement.select(&self.free_list, mem, required) else {
      let err = AllocError::OutOfMemory(size);
      log::warn!("{err}");
      return Err(err);
    };

    let carved = self.free_list.carve(mem, candidate, required);
    self.placement.allocated(carved.resume_at);

    let capacity = capacity(carved.span);
    Slot::allocated(capacity).write(mem, candidate.node);

    self.free_bytes -= carved.span;
    self.allocated_bytes += capacity;
    self.alloc_count += 1;

    let ptr = Ptr(candidate.node + HEADER_SIZE);
    self.record(EventKind::Allocate, ptr, capacity);
    log::trace!(
      "allocated {} bytes at {:#x} (capacity {}, {} bytes free)",
      size,
      ptr.0,
      capacity,
      self.free_bytes
    );

    Ok(ptr)
  }

  /// Returns a block to the free list, merging it with free neighbours.
  ///
  /// Freeing `None` does nothing. A pointer whose header does not carry the
  /// integrity tag is reported and the heap is left untouched.
  pub fn free(
    &mut self,
    ptr: impl Into<Option<Ptr>>,
  ) -> Result<(), CorruptionDetected> {
    let Some(ptr) = ptr.into() else {
      return Ok(());
    };

    let (header, capacity) = self.locate(ptr)?;
    self.release(header, HEADER_SIZE + capacity);

    self.allocated_bytes -= capacity;
    self.free_bytes += HEADER_SIZE + capacity;
    self.dealloc_count += 1;

    self.record(EventKind::Free, ptr, capacity);
    log::trace!("freed {} bytes at {:#x}", capacity, ptr.0);

    Ok(())
  }

  /// Resizes a block, in place when possible.
  ///
  /// - `None` behaves like [`Arena::alloc`].
  /// - A size of zero behaves like [`Arena::free`] and returns `None`.
  /// - Shrinking keeps the block and returns the tail to the free list.
  /// - Growing first tries to absorb the free block right behind this one;
  ///   otherwise the contents move to a new block and the old one is freed.
  ///   If that allocation fails the old block is left intact.
  pub fn realloc(
    &mut self,
    ptr: impl Into<Option<Ptr>>,
    size: usize,
  ) -> Result<Option<Ptr>, ReallocError> {
    let Some(ptr) = ptr.into() else {
      return Ok(Some(self.alloc(size)?));
    };

    if size == 0 {
      self.free(ptr)?;
      return Ok(None);
    }

    let (header, capacity) = self.locate(ptr)?;

    if size > self.total_size() {
      let err = AllocError::ZeroOrOversizedRequest(size);
      log::warn!("{err}");
      return Err(err.into());
    }

    let wanted = align!(size);

    if wanted <= capacity {
      self.shrink(header, capacity, wanted);
      return Ok(Some(ptr));
    }

    if self.grow(header, capacity, wanted) {
      return Ok(Some(ptr));
    }

    let moved = self.alloc(size).inspect_err(|_| {
      log::warn!("realloc of {:#x} to {} bytes failed", ptr.0, size);
    })?;

    let len = capacity.min(size);
    self
      .backing
      .as_mut_slice()
      .copy_within(ptr.0..ptr.0 + len, moved.0);
    self.free(ptr)?;

    log::trace!("moved {} bytes from {:#x} to {:#x}", len, ptr.0, moved.0);

    Ok(Some(moved))
  }

  fn shrink(
    &mut self,
    header: usize,
    capacity: usize,
    wanted: usize,
  ) {
    let tail = capacity - wanted;
    if tail < MIN_FREE_NODE {
      return;
    }

    Slot::allocated(wanted).write(self.backing.as_mut_slice(), header);
    self.release(header + HEADER_SIZE + wanted, tail);

    self.allocated_bytes -= tail;
    self.free_bytes += tail;

    log::trace!(
      "shrunk block at {:#x} to {} bytes, released {}",
      header + HEADER_SIZE,
      wanted,
      tail
    );
  }

  fn grow(
    &mut self,
    header: usize,
    capacity: usize,
    wanted: usize,
  ) -> bool {
    let mem = self.backing.as_mut_slice();
    let neighbour = header + HEADER_SIZE + capacity;

    let Some(carved) = self.free_list.absorb(mem, neighbour, wanted - capacity) else {
      return false;
    };

    Slot::allocated(capacity + carved.span).write(mem, header);

    self.allocated_bytes += carved.span;
    self.free_bytes -= carved.span;

    log::trace!(
      "grew block at {:#x} in place to {} bytes",
      header + HEADER_SIZE,
      capacity + carved.span
    );

    true
  }

  fn release(
    &mut self,
    offset: usize,
    span: usize,
  ) {
    let node = self
      .free_list
      .release(self.backing.as_mut_slice(), offset, span);
    self.placement.released(node);
  }

  /// Validates a payload handle and returns its header offset and capacity.
  fn locate(
    &self,
    ptr: Ptr,
  ) -> Result<(usize, usize), CorruptionDetected> {
    let mem = self.backing.as_slice();
    let corrupted = CorruptionDetected { offset: ptr.0 };

    if ptr.0 < HEADER_SIZE || ptr.0 % ALIGNMENT != 0 || ptr.0 > mem.len() {
      log::error!("{corrupted}");
      return Err(corrupted);
    }

    let header = ptr.0 - HEADER_SIZE;
    match Slot::read(mem, header) {
      Slot::Allocated { size, .. } if size <= mem.len() - ptr.0 => Ok((header, size)),
      _ => {
        log::error!("{corrupted}");
        Err(corrupted)
      }
    }
  }

  /// Usable bytes of a live block.
  pub fn payload(
    &self,
    ptr: Ptr,
  ) -> Result<&[u8], CorruptionDetected> {
    let (_, capacity) = self.locate(ptr)?;
    Ok(&self.backing.as_slice()[ptr.0..ptr.0 + capacity])
  }

  pub fn payload_mut(
    &mut self,
    ptr: Ptr,
  ) -> Result<&mut [u8], CorruptionDetected> {
    let (_, capacity) = self.locate(ptr)?;
    Ok(&mut self.backing.as_mut_slice()[ptr.0..ptr.0 + capacity])
  }

  /// Address of the payload in memory.
  pub fn as_mut_ptr(
    &mut self,
    ptr: Ptr,
  ) -> *mut u8 {
    self.backing.as_mut_ptr().wrapping_add(ptr.0)
  }

  /// Translates an address inside the region back into a handle.
  pub fn ptr_from_addr(
    &self,
    addr: *mut u8,
  ) -> Ptr {
    Ptr((addr as usize).wrapping_sub(self.backing.as_ptr() as usize))
  }

  pub fn stats(&self) -> Stats {
    let live_blocks = self.alloc_count - self.dealloc_count;

    Stats {
      alloc_count: self.alloc_count,
      dealloc_count: self.dealloc_count,
      live_blocks,
      allocated_bytes: self.allocated_bytes,
      free_bytes: self.free_bytes,
      header_overhead: live_blocks * HEADER_SIZE,
      fragmentation_pct: stats::fragmentation(
        self.free_blocks().map(|node| node.size),
        self.small_block_ratio,
      ),
    }
  }

  /// Free nodes in address order.
  pub fn free_blocks(&self) -> Nodes<'_> {
    self.free_list.iter(self.backing.as_slice())
  }

  /// Walks every block of the region, live or free, in address order.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      mem: self.backing.as_slice(),
      offset: 0,
    }
  }

  pub fn events(&self) -> &[Event] {
    self.events.as_deref().unwrap_or_default()
  }

  /// Writes the operation log, one `ALLOCATE`/`FREE` line per event.
  pub fn write_events(
    &self,
    out: impl std::io::Write,
  ) -> std::io::Result<()> {
    event::write_events(self.events(), out)
  }

  fn record(
    &mut self,
    kind: EventKind,
    ptr: Ptr,
    size: usize,
  ) {
    if let Some(events) = &mut self.events {
      events.push(Event {
        kind,
        offset: ptr.0,
        size,
      });
    }
  }

  /// Checks the structural invariants of the heap: the free list is sorted
  /// and fully coalesced, blocks tile the region, and the counters add up.
  pub fn verify(&self) -> Result<(), HeapViolation> {
    let mem = self.backing.as_slice();
    let mut listed = 0;
    let mut prev: Option<FreeNode> = None;

    for node in self.free_list.iter(mem) {
      if let Some(prev) = prev {
        if node.offset < prev.end() {
          return Err(HeapViolation::Unordered {
            node: prev.offset,
            next: node.offset,
          });
        }
        if node.offset == prev.end() {
          return Err(HeapViolation::Uncoalesced {
            node: prev.offset,
            next: node.offset,
          });
        }
      }
      if node.size < MIN_FREE_NODE || node.end() > mem.len() {
        return Err(HeapViolation::OutOfBounds {
          node: node.offset,
          size: node.size,
        });
      }
      listed += node.size;
      prev = Some(node);
    }

    let mut offset = 0;
    let mut live = 0;
    while offset < mem.len() {
      if mem.len() - offset < HEADER_SIZE {
        return Err(HeapViolation::BrokenTiling { offset });
      }

      let slot = Slot::read(mem, offset);
      let span = slot.span();
      if span < HEADER_SIZE || span > mem.len() - offset {
        return Err(HeapViolation::BrokenTiling { offset });
      }

      match slot {
        Slot::Free { .. } if !self.free_list.contains(mem, offset) => {
          return Err(HeapViolation::Unlisted { offset });
        }
        Slot::Free { .. } => {}
        Slot::Allocated { .. } => live += span,
      }
      offset += span;
    }

    let stats = self.stats();
    let accounted = stats.allocated_bytes + stats.free_bytes + stats.header_overhead;
    if listed + live != mem.len() || listed != self.free_bytes || accounted != mem.len() {
      return Err(HeapViolation::Conservation {
        accounted,
        total: mem.len(),
      });
    }

    Ok(())
  }

  /// Releases the region.
  pub fn teardown(self) {
    log::debug!("releasing {} byte region", self.total_size());
  }
}

/// Iterator over the physical blocks of a region.
pub struct Blocks<'a> {
  mem: &'a [u8],
  offset: usize,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    if self.mem.len() - self.offset < HEADER_SIZE {
      return None;
    }

    let offset = self.offset;
    let slot = Slot::read(self.mem, offset);
    let span = slot.span();
    if span < HEADER_SIZE || span > self.mem.len() - offset {
      self.offset = self.mem.len();
      return None;
    }
    self.offset += span;

    let state = match slot {
      Slot::Free { .. } => BlockState::Free,
      Slot::Allocated { size, .. } => BlockState::Allocated { capacity: size },
    };

    Some(BlockInfo {
      offset,
      span,
      state,
    })
  }
}
