//! Address-ordered free list threaded through the region itself.
//!
//! Every node lives in the first [`HEADER_SIZE`] bytes of the free span it
//! describes, so the list needs no storage of its own beyond the head offset.

use crate::block::{HEADER_SIZE, MIN_FREE_NODE, Slot};

/// A free node as seen while walking the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeNode {
  pub offset: usize,
  pub size: usize,
  pub next: Option<usize>,
}

impl FreeNode {
  pub fn read(
    mem: &[u8],
    offset: usize,
  ) -> Self {
    match Slot::read(mem, offset) {
      Slot::Free { size, next } => Self { offset, size, next },
      Slot::Allocated { .. } => unreachable!("allocated block at {offset:#x} linked as free"),
    }
  }

  pub fn end(&self) -> usize {
    self.offset + self.size
  }
}

/// A node chosen by a placement strategy, with its list predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
  pub prev: Option<usize>,
  pub node: usize,
}

/// Outcome of carving an allocation out of a free node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carved {
  /// Full span handed to the allocation, header included.
  pub span: usize,
  /// Node that took the candidate's place in the list: the split
  /// remainder, or the candidate's old successor when it was consumed.
  pub resume_at: Option<usize>,
}

#[derive(Debug, Default)]
pub struct FreeList {
  head: Option<usize>,
}

impl FreeList {
  /// Creates a list holding a single node spanning `mem`.
  pub fn spanning(mem: &mut [u8]) -> Self {
    Slot::free(mem.len(), None).write(mem, 0);
    Self { head: Some(0) }
  }

  pub fn head(&self) -> Option<usize> {
    self.head
  }

  pub fn iter<'a>(
    &self,
    mem: &'a [u8],
  ) -> Nodes<'a> {
    Nodes {
      mem,
      current: self.head,
    }
  }

  pub fn contains(
    &self,
    mem: &[u8],
    offset: usize,
  ) -> bool {
    self
      .iter(mem)
      .take_while(|node| node.offset <= offset)
      .any(|node| node.offset == offset)
  }

  /// Last node below `offset`: the list predecessor of a node at `offset`.
  pub fn predecessor(
    &self,
    mem: &[u8],
    offset: usize,
  ) -> Option<usize> {
    self
      .iter(mem)
      .take_while(|node| node.offset < offset)
      .last()
      .map(|node| node.offset)
  }

  fn link(
    &mut self,
    mem: &mut [u8],
    prev: Option<usize>,
    next: Option<usize>,
  ) {
    match prev {
      None => self.head = next,
      Some(prev) => {
        let node = FreeNode::read(mem, prev);
        Slot::free(node.size, next).write(mem, prev);
      }
    }
  }

  /// Carves `required` bytes off the front of the candidate node.
  ///
  /// When the leftover can host a free node it stays on the list in the
  /// candidate's position; otherwise the whole node is consumed and the
  /// few extra bytes become part of the allocation.
  pub fn carve(
    &mut self,
    mem: &mut [u8],
    candidate: Candidate,
    required: usize,
  ) -> Carved {
    let node = FreeNode::read(mem, candidate.node);
    debug_assert!(node.size >= required);

    if node.size >= required + MIN_FREE_NODE {
      let remainder = node.offset + required;
      Slot::free(node.size - required, node.next).write(mem, remainder);
      self.link(mem, candidate.prev, Some(remainder));

      Carved {
        span: required,
        resume_at: Some(remainder),
      }
    } else {
      self.link(mem, candidate.prev, node.next);

      Carved {
        span: node.size,
        resume_at: node.next,
      }
    }
  }

  /// Adds the span at `offset` to the list in address order and merges it
  /// with any physically adjacent free neighbours. Returns the offset of the
  /// node that now covers the span.
  pub fn release(
    &mut self,
    mem: &mut [u8],
    offset: usize,
    size: usize,
  ) -> usize {
    self.insert(mem, offset, size);
    self.coalesce(mem, offset)
  }

  fn insert(
    &mut self,
    mem: &mut [u8],
    offset: usize,
    size: usize,
  ) {
    let prev = self.predecessor(mem, offset);
    let next = match prev {
      None => self.head,
      Some(prev) => FreeNode::read(mem, prev).next,
    };

    Slot::free(size, next).write(mem, offset);
    self.link(mem, prev, Some(offset));
  }

  fn coalesce(
    &mut self,
    mem: &mut [u8],
    offset: usize,
  ) -> usize {
    let mut node = FreeNode::read(mem, offset);

    if let Some(next) = node.next.filter(|&next| next == node.end()) {
      let next = FreeNode::read(mem, next);
      node.size += next.size;
      node.next = next.next;
      Slot::free(node.size, node.next).write(mem, node.offset);
    }

    match self.predecessor(mem, offset) {
      Some(prev) => {
        let prev = FreeNode::read(mem, prev);
        if prev.end() == node.offset {
          Slot::free(prev.size + node.size, node.next).write(mem, prev.offset);
          return prev.offset;
        }
        node.offset
      }
      None => node.offset,
    }
  }

  /// Grows the allocation whose block ends at `offset` by consuming at least
  /// `needed` bytes of the free node starting there. Returns the bytes
  /// consumed and the node now occupying that list position, or `None` when
  /// no such node exists or it is too small.
  pub fn absorb(
    &mut self,
    mem: &mut [u8],
    offset: usize,
    needed: usize,
  ) -> Option<Carved> {
    if !self.contains(mem, offset) {
      return None;
    }

    let node = FreeNode::read(mem, offset);
    if node.size < needed {
      return None;
    }

    let prev = self.predecessor(mem, offset);
    Some(self.carve(mem, Candidate { prev, node: offset }, needed))
  }
}

/// Iterator over the free list in address order.
#[derive(Clone)]
pub struct Nodes<'a> {
  mem: &'a [u8],
  current: Option<usize>,
}

impl Iterator for Nodes<'_> {
  type Item = FreeNode;

  fn next(&mut self) -> Option<Self::Item> {
    let node = FreeNode::read(self.mem, self.current?);
    self.current = node.next;
    Some(node)
  }
}

/// Payload capacity of a block with the given span.
pub fn capacity(span: usize) -> usize {
  span - HEADER_SIZE
}
