use std::{env, io, process};

use fitalloc::{Arena, ArenaConfig, BlockState, Strategy, print_stats};

/// Prints every block of the region, live or free, in address order.
fn print_memory_map(arena: &Arena) {
  println!("  {:>8}  {:>8}  state", "offset", "span");
  for block in arena.blocks() {
    let state = match block.state {
      BlockState::Free => "free".to_string(),
      BlockState::Allocated { capacity } => format!("live ({capacity} usable)"),
    };
    println!("  {:>#8x}  {:>8}  {}", block.offset, block.span, state);
  }
}

fn run(strategy: Strategy) {
  println!("\n==================== {strategy} ====================");

  let config = ArenaConfig::new(8192)
    .strategy(strategy)
    .record_events(true);
  let mut arena = match Arena::init(config) {
    Ok(arena) => arena,
    Err(err) => {
      eprintln!("Failed to initialize memory: {err}");
      process::exit(1);
    }
  };

  // --------------------------------------------------------------------
  // 1) Carve out a row of blocks, then free every other one so the free
  //    list holds holes of 64, 256 and 128 bytes in that order.
  // --------------------------------------------------------------------
  let sizes = [48, 8, 240, 8, 112, 8];
  let blocks: Vec<_> = sizes
    .iter()
    .map(|&size| arena.alloc(size).expect("demo region is large enough"))
    .collect();
  for block in blocks.iter().step_by(2) {
    arena.free(*block).expect("block is live");
  }

  println!("\n[1] Holes of 64, 256 and 128 bytes before the tail:");
  print_memory_map(&arena);

  // --------------------------------------------------------------------
  // 2) Ask for 80 bytes (96 with header). Each strategy picks a
  //    different hole.
  // --------------------------------------------------------------------
  let chosen = arena.alloc(80).expect("a hole fits");
  println!("\n[2] alloc(80) landed at {:#x}", chosen.offset());
  print_memory_map(&arena);

  // --------------------------------------------------------------------
  // 3) Grow the block. It stays put when the bytes behind it are free.
  // --------------------------------------------------------------------
  arena.payload_mut(chosen).expect("block is live")[..4].copy_from_slice(b"data");
  let grown = arena
    .realloc(chosen, 150)
    .expect("realloc succeeds")
    .expect("size is non-zero");
  println!(
    "\n[3] realloc(150): {:#x} -> {:#x} ({})",
    chosen.offset(),
    grown.offset(),
    if grown == chosen { "in place" } else { "moved" }
  );

  print_stats(&arena.stats());

  println!("\n[4] Operation log:");
  if let Err(err) = arena.write_events(io::stdout()) {
    eprintln!("failed to write log: {err}");
  }

  arena.teardown();
}

fn main() {
  let strategies = match env::args().nth(1) {
    Some(name) => match name.parse::<Strategy>() {
      Ok(strategy) => vec![strategy],
      Err(err) => {
        eprintln!("{err}");
        process::exit(2);
      }
    },
    None => Strategy::ALL.to_vec(),
  };

  for strategy in strategies {
    run(strategy);
  }
}
