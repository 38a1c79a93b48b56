//! Process-wide arena with a C-style surface.
//!
//! Mirrors the classic `myinit`/`myalloc`/`myfree`/`mydestroy` contract:
//! failures come back as a negative code or a null pointer, and [`status`]
//! holds the outcome of the most recent call. [`free`] has no other way to
//! report failure.
//!
//! The arena is shared by the whole process. Calls from different threads
//! are serialized, but `status` reports whichever call finished last.

use std::ptr;

use crate::{error::SUCCESS, sync::SyncAllocator};

static ARENA: SyncAllocator = SyncAllocator::new();

/// Maps the process-wide arena. Returns its size, or a negative error code.
pub fn init(size: usize) -> isize {
  match ARENA.init(size) {
    Ok(size) => size as isize,
    Err(err) => err.code() as isize,
  }
}

/// Unmaps the process-wide arena. Returns `0`, or a negative error code.
pub fn destroy() -> i32 {
  match ARENA.destroy() {
    Ok(()) => SUCCESS,
    Err(err) => err.code(),
  }
}

/// Allocates `size` bytes, or returns null and sets [`status`].
pub fn alloc(size: usize) -> *mut u8 {
  ARENA
    .allocate(size)
    .map_or(ptr::null_mut(), |address| address.as_ptr())
}

/// Frees a pointer returned by [`alloc`]. Check [`status`] for the outcome.
///
/// # Safety
///
/// Same contract as [`Allocator::free`](crate::Allocator::free).
pub unsafe fn free(address: *mut u8) {
  let _ = unsafe { ARENA.free(address) };
}

/// Outcome code of the most recent call on the process-wide arena.
pub fn status() -> i32 {
  ARENA.status()
}
