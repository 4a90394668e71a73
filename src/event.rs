use std::{fmt, io};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
  Allocate,
  Free,
}

/// One entry of an arena's operation log.
///
/// Rendered as `ALLOCATE 0x<offset> <size>` or `FREE 0x<offset> <size>`,
/// the line format expected by heap visualisation tools. `offset` is the
/// payload offset and `size` its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
  pub kind: EventKind,
  pub offset: usize,
  pub size: usize,
}

impl fmt::Display for Event {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let kind = match self.kind {
      EventKind::Allocate => "ALLOCATE",
      EventKind::Free => "FREE",
    };
    write!(f, "{kind} {:#x} {}", self.offset, self.size)
  }
}

/// Writes one event per line.
pub fn write_events<'a>(
  events: impl IntoIterator<Item = &'a Event>,
  mut out: impl io::Write,
) -> io::Result<()> {
  for event in events {
    writeln!(out, "{event}")?;
  }
  out.flush()
}
