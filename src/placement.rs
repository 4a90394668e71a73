//! Placement strategies: which free node serves a request.

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::free_list::{Candidate, FreeList, FreeNode};

/// Search policy over the free list, chosen once per arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
  /// First node large enough, scanning from the lowest address.
  #[default]
  FirstFit,
  /// Smallest node large enough; the lowest address wins ties.
  BestFit,
  /// Largest node, if it is large enough.
  WorstFit,
  /// Like first fit, but resumes where the previous allocation left off and
  /// wraps around the end of the list.
  NextFit,
}

impl Strategy {
  pub const ALL: [Strategy; 4] = [
    Strategy::FirstFit,
    Strategy::BestFit,
    Strategy::WorstFit,
    Strategy::NextFit,
  ];

  pub(crate) fn placement(self) -> Box<dyn Placement> {
    match self {
      Strategy::FirstFit => Box::new(FirstFit),
      Strategy::BestFit => Box::new(BestFit),
      Strategy::WorstFit => Box::new(WorstFit),
      Strategy::NextFit => Box::new(NextFit::default()),
    }
  }
}

impl fmt::Display for Strategy {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let name = match self {
      Strategy::FirstFit => "first-fit",
      Strategy::BestFit => "best-fit",
      Strategy::WorstFit => "worst-fit",
      Strategy::NextFit => "next-fit",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy '{0}', expected first, best, worst or next")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
  type Err = UnknownStrategy;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let name = s.to_ascii_lowercase();
    let name = name
      .strip_suffix("-fit")
      .or_else(|| name.strip_suffix("_fit"))
      .unwrap_or(&name);

    match name {
      "first" => Ok(Strategy::FirstFit),
      "best" => Ok(Strategy::BestFit),
      "worst" => Ok(Strategy::WorstFit),
      "next" => Ok(Strategy::NextFit),
      _ => Err(UnknownStrategy(s.to_string())),
    }
  }
}

/// Selects a free node able to hold `required` bytes.
///
/// The hooks let stateful strategies follow the list as the arena mutates
/// it; stateless strategies ignore them.
pub(crate) trait Placement {
  fn select(
    &mut self,
    list: &FreeList,
    mem: &[u8],
    required: usize,
  ) -> Option<Candidate>;

  /// An allocation was carved from the selected node; `resume_at` is the
  /// node that replaced it in the list.
  fn allocated(
    &mut self,
    _resume_at: Option<usize>,
  ) {
  }

  /// A span was returned to the list and now lives in the node at `node`.
  fn released(
    &mut self,
    _node: usize,
  ) {
  }
}

/// Walks the list keeping track of each node's predecessor.
fn with_prev(
  list: &FreeList,
  mem: &[u8],
) -> impl Iterator<Item = (Option<usize>, FreeNode)> {
  list.iter(mem).scan(None, |prev, node| {
    let item = (*prev, node);
    *prev = Some(node.offset);
    Some(item)
  })
}

struct FirstFit;

impl Placement for FirstFit {
  fn select(
    &mut self,
    list: &FreeList,
    mem: &[u8],
    required: usize,
  ) -> Option<Candidate> {
    with_prev(list, mem)
      .find(|(_, node)| node.size >= required)
      .map(|(prev, node)| Candidate {
        prev,
        node: node.offset,
      })
  }
}

struct BestFit;

impl Placement for BestFit {
  fn select(
    &mut self,
    list: &FreeList,
    mem: &[u8],
    required: usize,
  ) -> Option<Candidate> {
    let mut best: Option<(Option<usize>, FreeNode)> = None;

    for (prev, node) in with_prev(list, mem) {
      if node.size < required {
        continue;
      }
      if best.is_none_or(|(_, b)| node.size < b.size) {
        best = Some((prev, node));
      }
    }

    best.map(|(prev, node)| Candidate {
      prev,
      node: node.offset,
    })
  }
}

struct WorstFit;

impl Placement for WorstFit {
  fn select(
    &mut self,
    list: &FreeList,
    mem: &[u8],
    required: usize,
  ) -> Option<Candidate> {
    let mut worst: Option<(Option<usize>, FreeNode)> = None;

    for (prev, node) in with_prev(list, mem) {
      if worst.is_none_or(|(_, w)| node.size > w.size) {
        worst = Some((prev, node));
      }
    }

    worst
      .filter(|(_, node)| node.size >= required)
      .map(|(prev, node)| Candidate {
        prev,
        node: node.offset,
      })
  }
}

/// Roving-pointer first fit.
///
/// The cursor names the node where the next search begins. It is a plain
/// offset and may go stale when that node is consumed or merged away, so it
/// is checked against the list before every search.
#[derive(Debug, Default)]
struct NextFit {
  cursor: Option<usize>,
}

impl NextFit {
  fn start(
    &self,
    list: &FreeList,
    mem: &[u8],
  ) -> Option<usize> {
    match self.cursor {
      Some(cursor) if list.contains(mem, cursor) => Some(cursor),
      _ => list.head(),
    }
  }
}

impl Placement for NextFit {
  fn select(
    &mut self,
    list: &FreeList,
    mem: &[u8],
    required: usize,
  ) -> Option<Candidate> {
    let start = self.start(list, mem)?;

    // From the cursor to the end of the list.
    let mut prev = list.predecessor(mem, start);
    let mut current = Some(start);
    while let Some(offset) = current {
      let node = FreeNode::read(mem, offset);
      if node.size >= required {
        return Some(Candidate { prev, node: offset });
      }
      prev = Some(offset);
      current = node.next;
    }

    // Wrap to the head and stop once the scan is back at its start.
    with_prev(list, mem)
      .take_while(|(_, node)| node.offset != start)
      .find(|(_, node)| node.size >= required)
      .map(|(prev, node)| Candidate {
        prev,
        node: node.offset,
      })
  }

  fn allocated(
    &mut self,
    resume_at: Option<usize>,
  ) {
    self.cursor = resume_at;
  }

  fn released(
    &mut self,
    node: usize,
  ) {
    if self.cursor.is_none_or(|cursor| node < cursor) {
      self.cursor = Some(node);
    }
  }
}
