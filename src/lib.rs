//! # fitalloc - A Free-List Heap Allocator
//!
//! This crate provides a general-purpose **free-list allocator** that manages
//! a single pre-reserved memory region, with a choice of four placement
//! strategies: first, best, worst and next fit.
//!
//! ## Overview
//!
//! The region is reserved once and then carved into blocks. Every block
//! starts with a 16-byte metadata slot; free blocks are chained into a list
//! sorted by address:
//!
//! ```text
//!   Region:
//!
//!   ┌──────────────┬──────────────┬──────────────┬──────────────────────────┐
//!   │   A (live)   │   free       │   B (live)   │          free            │
//!   └──────────────┴──────┬───────┴──────────────┴────────────┬─────────────┘
//!                         ▲                                   ▲
//!   head ─────────────────┘ ──── next ────────────────────────┘
//!
//!   Allocation: a strategy picks a free node, the front of it becomes the
//!   block and any remainder large enough to hold a node stays on the list.
//!   Free: the block is linked back in address order and merged with
//!   physically adjacent free neighbours.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   fitalloc
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── arena      - Arena: alloc, free, realloc, stats, heap walk
//!   ├── backing    - Raw region providers (mmap, heap buffer)
//!   ├── block      - Metadata slot layout (internal)
//!   ├── config     - ArenaConfig builder
//!   ├── error      - Error types
//!   ├── event      - Operation log
//!   ├── free_list  - Address-ordered free list, splitting, coalescing (internal)
//!   ├── global     - malloc-style functions over a thread-owned arena
//!   ├── placement  - Fit strategies
//!   └── stats      - Counters and the fragmentation estimate
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use fitalloc::{Arena, ArenaConfig, Strategy};
//!
//! let mut arena = Arena::init(ArenaConfig::new(8192).strategy(Strategy::BestFit)).unwrap();
//!
//! let block = arena.alloc(128).unwrap();
//! arena.payload_mut(block).unwrap()[..5].copy_from_slice(b"hello");
//!
//! let block = arena.realloc(block, 512).unwrap().unwrap();
//! assert_eq!(&arena.payload(block).unwrap()[..5], b"hello");
//!
//! arena.free(block).unwrap();
//! assert_eq!(arena.stats().live_blocks, 0);
//! ```
//!
//! Or, closer to `malloc(3)`:
//!
//! ```rust
//! use fitalloc::{Strategy, global};
//!
//! global::init(8192, Strategy::FirstFit).unwrap();
//!
//! let ptr = global::alloc(64);
//! assert!(!ptr.is_null());
//! global::free(ptr);
//!
//! global::stats();
//! global::teardown();
//! ```
//!
//! ## Block Layout
//!
//! ```text
//!   Live block:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ capacity: N     │  │  ┌──────────────────────────┐  │
//!   │  │ tag: SENTINEL   │  │  │     N bytes usable       │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   │      16 bytes         │                                │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Ptr handed to the caller
//!
//!   Free block: the same 16 bytes hold { span, next free offset }.
//! ```
//!
//! Freeing overwrites the tag, so freeing the same block twice, or a block
//! whose header was overwritten, is caught and reported as
//! [`CorruptionDetected`].
//!
//! ## Limitations
//!
//! - **Single-threaded**: an arena has no synchronization; share it behind
//!   a lock or give each thread its own.
//! - **Fixed size**: the region never grows after [`Arena::init`].
//! - **Unix-only**: regions come from `mmap(2)` through `libc`.

pub mod align;
mod arena;
mod backing;
mod block;
mod config;
mod error;
mod event;
mod free_list;
pub mod global;
mod placement;
mod stats;

pub use arena::{Arena, BlockInfo, BlockState, Blocks, Ptr};
pub use backing::{Backing, MmapBacking, VecBacking, page_size};
pub use block::{HEADER_SIZE, MIN_FREE_NODE};
pub use config::{ArenaConfig, DEFAULT_SMALL_BLOCK_RATIO};
pub use error::{
  AllocError, BackingStoreError, CorruptionDetected, HeapViolation, InitError, ReallocError,
};
pub use event::{Event, EventKind};
pub use free_list::{FreeNode, Nodes};
pub use placement::{Strategy, UnknownStrategy};
pub use stats::{Stats, print_stats};
