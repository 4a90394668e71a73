//! malloc-style functions over one implicitly owned arena.
//!
//! The arena lives in a thread-local slot: the engine has no locking, so
//! every thread that calls [`init`] owns an independent region and never
//! observes another thread's. Within a thread the slot behaves like the
//! process-wide allocator of a C runtime: one region until [`teardown`].
//!
//! Unlike [`Arena`], these functions speak raw pointers and report failures
//! the way `malloc` does: a null pointer plus a diagnostic. Heap corruption
//! detected by [`free`] or [`realloc`] terminates the process.

use std::{cell::RefCell, process, ptr};

use crate::{
  arena::Arena,
  config::ArenaConfig,
  error::{AllocError, InitError, ReallocError},
  placement::Strategy,
  stats::{Stats, print_stats},
};

thread_local! {
  static ARENA: RefCell<Option<Arena>> = const { RefCell::new(None) };
}

/// Reserves the region. Fails if one is already installed; that region
/// remains usable.
pub fn init(
  size: usize,
  strategy: Strategy,
) -> Result<(), InitError> {
  ARENA.with_borrow_mut(|slot| {
    if slot.is_some() {
      log::warn!("{}", InitError::AlreadyInitialized);
      return Err(InitError::AlreadyInitialized);
    }

    let arena = Arena::init(ArenaConfig::new(size).strategy(strategy)).inspect_err(|err| {
      log::error!("{err}");
    })?;
    *slot = Some(arena);

    Ok(())
  })
}

/// Allocates `size` bytes, returning null on failure.
pub fn alloc(size: usize) -> *mut u8 {
  ARENA.with_borrow_mut(|slot| {
    let Some(arena) = slot else {
      log::warn!("{}", AllocError::NotInitialized);
      return ptr::null_mut();
    };

    match arena.alloc(size) {
      Ok(handle) => arena.as_mut_ptr(handle),
      Err(_) => ptr::null_mut(),
    }
  })
}

/// Frees a pointer returned by [`alloc`] or [`realloc`]. Null is ignored.
///
/// Terminates the process with exit status 1 if the block fails its
/// integrity check. A non-null pointer freed while no region is installed,
/// before [`init`] or after [`teardown`], cannot belong to any block and is
/// reported the same way.
pub fn free(addr: *mut u8) {
  if addr.is_null() {
    return;
  }

  let released = ARENA.with_borrow_mut(|slot| match slot {
    Some(arena) => {
      let handle = arena.ptr_from_addr(addr);
      arena.free(handle).is_ok()
    }
    None => false,
  });

  if !released {
    corrupted(addr);
  }
}

/// Resizes a block following `realloc(3)`: null behaves like [`alloc`],
/// size zero like [`free`]. Returns null if the block could not be resized,
/// in which case it is left untouched.
pub fn realloc(
  addr: *mut u8,
  size: usize,
) -> *mut u8 {
  let outcome = ARENA.with_borrow_mut(|slot| {
    let Some(arena) = slot else {
      log::warn!("{}", AllocError::NotInitialized);
      return Some(ptr::null_mut());
    };

    let handle = (!addr.is_null()).then(|| arena.ptr_from_addr(addr));
    match arena.realloc(handle, size) {
      Ok(Some(handle)) => Some(arena.as_mut_ptr(handle)),
      Ok(None) | Err(ReallocError::Alloc(_)) => Some(ptr::null_mut()),
      Err(ReallocError::Corruption(_)) => None,
    }
  });

  match outcome {
    Some(result) => result,
    None => corrupted(addr),
  }
}

/// Prints the statistics of the region to stdout.
pub fn stats() {
  match current_stats() {
    Some(stats) => print_stats(&stats),
    None => log::warn!("{}", AllocError::NotInitialized),
  }
}

pub fn current_stats() -> Option<Stats> {
  ARENA.with_borrow(|slot| slot.as_ref().map(Arena::stats))
}

/// Releases the region. Pointers handed out before become dangling; a new
/// region may be installed with [`init`].
pub fn teardown() {
  if let Some(arena) = ARENA.take() {
    arena.teardown();
  }
}

fn corrupted(addr: *mut u8) -> ! {
  log::error!("memory corruption or double free detected at {addr:p}");
  eprintln!("memory corruption or double free detected at {addr:p}");
  process::exit(1);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lifecycle() {
    assert!(alloc(16).is_null());
    assert!(current_stats().is_none());

    init(8192, Strategy::FirstFit).unwrap();
    assert!(matches!(
      init(8192, Strategy::BestFit),
      Err(InitError::AlreadyInitialized)
    ));

    let first = alloc(128);
    let second = alloc(256);
    assert!(!first.is_null() && !second.is_null());

    unsafe {
      first.write_bytes(0xCD, 128);
    }

    let grown = realloc(first, 200);
    assert!(!grown.is_null());
    assert_eq!(unsafe { grown.read() }, 0xCD);

    free(grown);
    free(second);
    free(ptr::null_mut());

    let stats = current_stats().unwrap();
    assert_eq!(stats.live_blocks, 0);
    assert_eq!(stats.allocated_bytes, 0);

    teardown();
    assert!(current_stats().is_none());
    init(4096, Strategy::NextFit).unwrap();
    teardown();
  }

  #[test]
  fn test_realloc_null_and_zero() {
    init(4096, Strategy::WorstFit).unwrap();

    let block = realloc(ptr::null_mut(), 64);
    assert!(!block.is_null());
    assert!(realloc(block, 0).is_null());
    assert_eq!(current_stats().unwrap().dealloc_count, 1);

    teardown();
  }
}
