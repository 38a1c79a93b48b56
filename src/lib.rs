//! # marena - A First-Fit Arena Allocator
//!
//! This crate provides a `malloc`/`free` style allocator that manages a single
//! fixed-size arena obtained from the operating system with `mmap(2)`.
//!
//! ## Overview
//!
//! The arena is mapped once, rounded up to the page size, and carved into
//! chunks. Each chunk starts with a header and links to its neighbors in
//! address order, so the list always tiles the whole arena:
//!
//! ```text
//!   Arena after three allocations and one free:
//!
//!   ┌──────┬──────┬──────┬──────┬──────┬──────┬──────┬─────────────────────┐
//!   │ hdr  │  A   │ hdr  │  B   │ hdr  │  C   │ hdr  │     free tail       │
//!   │ used │      │ free │      │ used │      │ free │                     │
//!   └──────┴──────┴──────┴──────┴──────┴──────┴──────┴─────────────────────┘
//!   ▲                                                                      ▲
//!   start                                                                end
//!
//!   forward  ───────►   ───────►   ───────►
//!   backward ◄───────   ◄───────   ◄───────
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   marena
//!   ├── align      - Page rounding macro (align_to!)
//!   ├── arena      - mmap'd region: map, bounds, unmap
//!   ├── chunk      - Chunk header layout, split and merge (internal)
//!   ├── allocator  - Allocator: first-fit search, split, coalesce
//!   ├── sync       - SyncAllocator, a mutex-guarded Allocator
//!   ├── global     - Process-wide arena with a C-style surface
//!   ├── config     - MAX_ARENA_SIZE and the platform page size
//!   └── error      - AllocError and its status codes
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use marena::Allocator;
//!
//! let mut allocator = Allocator::new();
//! let arena_size = allocator.init(4096).unwrap();
//! assert!(arena_size >= 4096);
//!
//! let ptr = allocator.allocate(8).unwrap().cast::<u64>();
//!
//! unsafe {
//!     ptr.as_ptr().write_unaligned(42);
//!     assert_eq!(ptr.as_ptr().read_unaligned(), 42);
//!
//!     allocator.free(ptr.as_ptr().cast()).unwrap();
//! }
//!
//! allocator.destroy().unwrap();
//! ```
//!
//! ## How It Works
//!
//! - **Allocation** scans from the lowest address for the first free chunk
//!   that fits. When the remainder can host another header plus at least one
//!   byte, it is split off as a new free chunk and the caller's chunk keeps
//!   exactly the bytes requested; otherwise the caller gets the whole chunk.
//! - **Free** marks the chunk free, merges the following chunk into it if that
//!   one is free, then merges it into the preceding chunk if that one is free.
//!   Two adjacent chunks are never both free at rest.
//!
//! ## Limitations
//!
//! - **Single-threaded core**: `Allocator` is not `Sync`; use `SyncAllocator`
//!   to share one arena
//! - **Fixed arena**: it never grows or shrinks after `init`
//! - **No alignment guarantee**: chunks keep exact sizes, so a data pointer
//!   may land on any byte; use `read_unaligned`/`write_unaligned` for typed
//!   values
//! - **Unix-only**: requires `libc` and `mmap`
//!
//! ## Safety
//!
//! `free` trusts its argument. Passing a pointer that did not come from
//! `allocate` on the same arena, or freeing one twice, is undefined behavior.
//! All pointers dangle once the arena is destroyed.

pub mod align;
mod allocator;
mod arena;
mod chunk;
pub mod config;
pub mod error;
pub mod global;
mod sync;

pub use allocator::{Allocator, ArenaStats, ChunkInfo, Chunks};
pub use chunk::HEADER_SIZE;
pub use config::{MAX_ARENA_SIZE, page_size};
pub use error::AllocError;
pub use sync::SyncAllocator;
